// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
#[macro_use]
pub mod constant_pool;
mod error;
mod parser;
mod reader;

pub use self::class_file::ClassFile;
pub use access_flags::{AccessFlags, InnerClassAccessFlags};
pub use attributes::{Attribute, AttributeInfo, Attributes};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::ClassFileError;
pub use parser::Parser;
pub use reader::Reader;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
