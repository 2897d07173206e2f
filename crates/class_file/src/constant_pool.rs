use std::{ops::Index, sync::Arc};

use crate::{ClassFileError, Result};

#[derive(Debug, Default)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    // Entries are addressed starting at one. Zero is reserved to mean
    // "no entry" in the places that allow it; those go through get_optional.
    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        index
            .checked_sub(1)
            .and_then(|i| self.cp_infos.get(i as usize))
            .ok_or(ClassFileError::InvalidConstantPoolIndex {
                index,
                size: self.cp_infos.len(),
            })
    }

    pub fn get_optional(&self, index: u16) -> Result<Option<&CpInfo>> {
        if index == 0 {
            return Ok(None);
        }

        self.get(index).map(Some)
    }
}
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        &self.cp_infos[index as usize - 1]
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index)? {
            crate::constant_pool::CpInfo::$i(ref n) => Ok(n),
            c => Err(crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
        }
    };
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    MethodRef(RefInfo),
    FieldRef(RefInfo),
    Float(f32),
    Double(f64),
    InterfaceMethodRef(RefInfo),
    Class(ClassInfo),
    NameAndType(NameAndTypeInfo),
    Utf8(Arc<str>),
    String { string_index: u16 },
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Integer(i32),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Long(i64),
    Module { name_index: u16 },
    Package { name_index: u16 },
    // The slot following a Long or Double entry
    Unusable,
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[cfg(test)]
mod constant_pool_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("java/lang/Object".into()),
            CpInfo::Class(ClassInfo { name_index: 1 }),
        ])
    }

    #[test]
    fn it_should_address_entries_starting_at_one() {
        assert_eq!(
            pool().get(1).unwrap(),
            &CpInfo::Utf8("java/lang/Object".into())
        );
        assert_eq!(pool()[2], CpInfo::Class(ClassInfo { name_index: 1 }));
    }

    #[test]
    fn it_should_reject_index_zero() {
        assert!(matches!(
            pool().get(0),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 0, size: 2 })
        ));
    }

    #[test]
    fn it_should_reject_an_index_past_the_end() {
        assert!(matches!(
            pool().get(3),
            Err(ClassFileError::InvalidConstantPoolIndex { index: 3, size: 2 })
        ));
    }

    #[test]
    fn it_should_treat_index_zero_as_absent_when_optional() {
        assert_eq!(pool().get_optional(0).unwrap(), None);
        assert!(pool().get_optional(2).unwrap().is_some());
    }

    #[test]
    fn it_should_iterate_entries_in_order() {
        let pool = pool();
        let entries = (&pool).into_iter().collect::<Vec<_>>();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], &CpInfo::Utf8("java/lang/Object".into()));
    }
}
