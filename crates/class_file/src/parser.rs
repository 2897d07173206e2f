use crate::{
    attributes::{Attribute, Attributes},
    class_file::{FieldInfo, MethodInfo},
};

use super::{constant_pool::CpInfo, *};

type Result<T, E = ClassFileError> = std::result::Result<T, E>;

pub struct Parser<'a> {
    r: Reader<'a>,
}
impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            r: Reader::new(buf),
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let _ = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool = self.parse_constant_pool()?;
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let this_class = self.r.read_u16()?;
        let super_class = self.r.read_u16()?;

        let interfaces_count = self.r.read_u16()?;
        let interfaces = (0..interfaces_count)
            .map(|_| self.r.read_u16())
            .collect::<Result<Vec<_>>>()?;

        let fields_count = self.r.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| self.parse_field_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.r.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| self.parse_method_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes_count = self.r.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, &constant_pool)?;

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_field_info(&mut self, constant_pool: &ConstantPool) -> Result<FieldInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let name_index = self.r.read_u16()?;
        let descriptor_index = self.r.read_u16()?;
        let attributes_count = self.r.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(FieldInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_method_info(&mut self, constant_pool: &ConstantPool) -> Result<MethodInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let name_index = self.r.read_u16()?;
        let descriptor_index = self.r.read_u16()?;
        let attributes_count = self.r.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.r.read_u32()? {
            0xCAFEBABE => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.r.read_u16()?;
        let major = self.r.read_u16()?;
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        // constant_pool_count is one more than the number of slots
        let constant_pool_count = self.r.read_u16()?;

        let mut count = (constant_pool_count as usize).saturating_sub(1);
        let mut res = Vec::with_capacity(count);
        while count > 0 {
            let (cp_info, slot_size) = self.parse_cp_info()?;
            // A Long or Double in the final slot would push its dead second
            // slot past the declared count.
            if slot_size > count {
                return Err(ClassFileError::ConstantPoolOverrun(res.len() as u16 + 1));
            }
            res.push(cp_info);
            (0..slot_size - 1).for_each(|_| res.push(CpInfo::Unusable));

            count -= slot_size;
        }
        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<(CpInfo, usize)> {
        let tag = self.r.read_u8()?;
        let (cp_info, slot_size) = match tag {
            1 => (self.parse_utf8()?, 1),
            3 => (self.parse_integer()?, 1),
            4 => (self.parse_float()?, 1),
            5 => (self.parse_long()?, 2),
            6 => (self.parse_double()?, 2),
            7 => (self.parse_class_info()?, 1),
            8 => (self.parse_string()?, 1),
            9 => (self.parse_field_ref()?, 1),
            10 => (self.parse_method_ref()?, 1),
            11 => (self.parse_interface_method_ref()?, 1),
            12 => (self.parse_name_and_type_info()?, 1),
            15 => (self.parse_method_handle()?, 1),
            16 => (self.parse_method_type_info()?, 1),
            17 => (self.parse_dynamic_info()?, 1),
            18 => (self.parse_invoke_dynamic_info()?, 1),
            19 => (self.parse_module()?, 1),
            20 => (self.parse_package()?, 1),
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        };

        Ok((cp_info, slot_size))
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.r.read_u16()?;
        let bytes = self.r.read_bytes(length as usize)?;

        Ok(CpInfo::Utf8(String::from_utf8_lossy(bytes).into()))
    }

    fn parse_integer(&mut self) -> Result<CpInfo> {
        let int = self.r.read_i32()?;

        Ok(CpInfo::Integer(int))
    }

    // Float and Double carry their IEEE 754 bit patterns big-endian
    fn parse_float(&mut self) -> Result<CpInfo> {
        let float = self.r.read_f32()?;

        Ok(CpInfo::Float(float))
    }

    fn parse_double(&mut self) -> Result<CpInfo> {
        let double = self.r.read_f64()?;

        Ok(CpInfo::Double(double))
    }

    fn parse_long(&mut self) -> Result<CpInfo> {
        let long = self.r.read_i64()?;

        Ok(CpInfo::Long(long))
    }

    fn parse_class_info(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;

        Ok(CpInfo::Class(constant_pool::ClassInfo { name_index }))
    }

    fn parse_string(&mut self) -> Result<CpInfo> {
        let string_index = self.r.read_u16()?;

        Ok(CpInfo::String { string_index })
    }

    fn parse_field_ref(&mut self) -> Result<CpInfo> {
        let ref_info = self.parse_ref_info()?;

        Ok(CpInfo::FieldRef(ref_info))
    }

    fn parse_method_ref(&mut self) -> Result<CpInfo> {
        let ref_info = self.parse_ref_info()?;

        Ok(CpInfo::MethodRef(ref_info))
    }

    fn parse_interface_method_ref(&mut self) -> Result<CpInfo> {
        let ref_info = self.parse_ref_info()?;

        Ok(CpInfo::InterfaceMethodRef(ref_info))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;
        let descriptor_index = self.r.read_u16()?;

        Ok(CpInfo::NameAndType(constant_pool::NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.r.read_u8()?;
        let reference_index = self.r.read_u16()?;

        Ok(CpInfo::MethodHandle(constant_pool::MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_method_type_info(&mut self) -> Result<CpInfo> {
        let descriptor_index = self.r.read_u16()?;

        Ok(CpInfo::MethodType(constant_pool::MethodTypeInfo {
            descriptor_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<CpInfo> {
        let dynamic_info = self.parse_dynamic()?;

        Ok(CpInfo::Dynamic(dynamic_info))
    }

    fn parse_invoke_dynamic_info(&mut self) -> Result<CpInfo> {
        let dynamic_info = self.parse_dynamic()?;

        Ok(CpInfo::InvokeDynamic(dynamic_info))
    }

    fn parse_module(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;

        Ok(CpInfo::Module { name_index })
    }

    fn parse_package(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;

        Ok(CpInfo::Package { name_index })
    }

    fn parse_ref_info(&mut self) -> Result<constant_pool::RefInfo> {
        let class_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(constant_pool::RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_dynamic(&mut self) -> Result<constant_pool::DynamicInfo> {
        let bootstrap_method_attr_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(constant_pool::DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_attributes(
        &mut self,
        attributes_count: u16,
        constant_pool: &ConstantPool,
    ) -> Result<Attributes> {
        (0..attributes_count)
            .into_iter()
            .map(|_| Attribute::parse(&mut self.r, constant_pool))
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::new(&[0xca, 0xfe, 0xba, 0xbe])
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(Parser::new(&[0xca, 0xfe, 0xba])
            .parse_magic_identifier()
            .is_err());
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xda, 0xda]).parse_magic_identifier(),
            Err(ClassFileError::InvalidMagicIdentifier(0xcafedada))
        ));
    }
}
