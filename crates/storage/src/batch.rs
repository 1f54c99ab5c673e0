//! Atomic write sets applied through [`KeyValueStore::write_batch`].
//!
//! [`KeyValueStore::write_batch`]: crate::KeyValueStore::write_batch

use smallvec::SmallVec;

use crate::Column;

macro_rules! inline_bytes {
    ($name:ident, $cap:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug)]
        pub struct $name(SmallVec<[u8; $cap]>);

        impl $name {
            pub fn as_slice(&self) -> &[u8] {
                self.0.as_slice()
            }

            pub fn into_vec(self) -> Vec<u8> {
                self.0.into_vec()
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(SmallVec::from_vec(bytes))
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                Self(SmallVec::from_slice(bytes))
            }
        }

        impl<const N: usize> From<[u8; N]> for $name {
            fn from(bytes: [u8; N]) -> Self {
                Self(SmallVec::from_slice(&bytes))
            }
        }

        impl<const N: usize> From<&[u8; N]> for $name {
            fn from(bytes: &[u8; N]) -> Self {
                Self(SmallVec::from_slice(bytes))
            }
        }
    };
}

inline_bytes!(WriteKey, 32, "Batch key, inline up to hash size.");
inline_bytes!(
    WriteValue,
    84,
    "Batch value, inline up to one chained-header record."
);

#[derive(Clone, Debug)]
pub enum WriteOp {
    Put {
        column: Column,
        key: WriteKey,
        value: WriteValue,
    },
    Delete {
        column: Column,
        key: WriteKey,
    },
}

/// An ordered set of writes a backend must apply atomically.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    entries: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    pub fn put(&mut self, column: Column, key: impl Into<WriteKey>, value: impl Into<WriteValue>) {
        self.entries.push(WriteOp::Put {
            column,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, column: Column, key: impl Into<WriteKey>) {
        self.entries.push(WriteOp::Delete {
            column,
            key: key.into(),
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WriteOp> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
