use std::sync::Arc;

use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Truncated input: needed {needed} bytes at offset {offset}")]
    TruncatedInput { offset: usize, needed: usize },
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Invalid constant pool index {index} (pool holds {size} entries)")]
    InvalidConstantPoolIndex { index: u16, size: usize },
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Two-slot constant pool entry {0} overruns the declared pool size")]
    ConstantPoolOverrun(u16),
    #[error("Attribute {name} left {remaining} bytes of its body undecoded")]
    AttributeBytesRemaining { name: Arc<str>, remaining: usize },
    #[error("Attributes nest deeper than {0} levels")]
    AttributeNestingTooDeep(usize),
    #[error("In attribute {name} at body offset {offset}: {source}")]
    AttributeDecode {
        name: Arc<str>,
        offset: usize,
        source: Box<ClassFileError>,
    },
}
impl ClassFileError {
    pub(crate) fn in_attribute(self, name: &Arc<str>, offset: usize) -> Self {
        ClassFileError::AttributeDecode {
            name: Arc::clone(name),
            offset,
            source: Box::new(self),
        }
    }
}
