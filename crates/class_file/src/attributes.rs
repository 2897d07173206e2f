use std::{fmt, sync::Arc};

use crate::{
    constant_pool::CpInfo, matches_cp_info, reader::Reader, ClassFileError, ConstantPool,
    InnerClassAccessFlags, Result,
};

// The format itself puts no bound on Code-in-Code nesting, so the decoder
// caps it rather than recurse until the stack runs out.
const MAX_ATTRIBUTE_NESTING: usize = 64;

#[derive(Debug, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| &*a.name == name)
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        match self.find_by_name("Code")?.info {
            AttributeInfo::Code(ref code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Attribute {
    pub name: Arc<str>,
    pub info: AttributeInfo,
}
impl Attribute {
    pub fn parse(r: &mut Reader<'_>, constant_pool: &ConstantPool) -> Result<Attribute> {
        Self::parse_at_depth(r, constant_pool, 0)
    }

    fn parse_at_depth(
        r: &mut Reader<'_>,
        constant_pool: &ConstantPool,
        depth: usize,
    ) -> Result<Attribute> {
        let attribute_name_index = r.read_u16()?;
        let attribute_length = r.read_u32()?;
        let name = Arc::clone(matches_cp_info!(constant_pool, attribute_name_index, Utf8)?);

        // The body is sliced off up front, so a variant decoder can neither
        // read past it nor leave the outer reader misaligned.
        let mut body = Reader::new(r.read_bytes(attribute_length as usize)?);
        let info = AttributeInfo::parse(&name, &mut body, constant_pool, depth)
            .map_err(|e| e.in_attribute(&name, body.position()))?;

        if body.remaining() > 0 {
            return Err(ClassFileError::AttributeBytesRemaining {
                name,
                remaining: body.remaining(),
            });
        }

        Ok(Attribute { name, info })
    }
}

// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7
#[derive(Debug, PartialEq)]
pub enum AttributeInfo {
    ConstantValue(CpInfo),
    Code(CodeAttribute),
    Exceptions(Vec<u16>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod {
        class: CpInfo,
        method: Option<CpInfo>,
    },
    Synthetic,
    Signature(Arc<str>),
    SourceFile(Arc<str>),
    SourceDebugExtension(Vec<u8>),
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariableType>),
    Deprecated,
    BootstrapMethods(Vec<BootstrapMethod>),
    ModulePackages(Vec<CpInfo>),
    ModuleMainClass(CpInfo),
    NestHost(CpInfo),
    Unknown(Vec<u8>),
}
impl AttributeInfo {
    fn parse(
        name: &str,
        r: &mut Reader<'_>,
        constant_pool: &ConstantPool,
        depth: usize,
    ) -> Result<Self> {
        Ok(match name {
            "ConstantValue" => {
                AttributeInfo::ConstantValue(required_entry(r, constant_pool)?.clone())
            }
            "Code" => AttributeInfo::Code(parse_code(r, constant_pool, depth)?),
            // The thrown exception classes stay as pool indices
            "Exceptions" => AttributeInfo::Exceptions(parse_index_table(r)?),
            "InnerClasses" => AttributeInfo::InnerClasses(parse_inner_classes(r, constant_pool)?),
            "EnclosingMethod" => {
                let class = required_entry(r, constant_pool)?.clone();
                // method_index is zero when the enclosing context is not a method
                let method = optional_entry(r, constant_pool)?.cloned();
                AttributeInfo::EnclosingMethod { class, method }
            }
            "Synthetic" => AttributeInfo::Synthetic,
            "Signature" => AttributeInfo::Signature(utf8_entry(r, constant_pool)?),
            "SourceFile" => AttributeInfo::SourceFile(utf8_entry(r, constant_pool)?),
            "SourceDebugExtension" => {
                AttributeInfo::SourceDebugExtension(r.read_remaining().to_vec())
            }
            "LineNumberTable" => AttributeInfo::LineNumberTable(parse_line_number_table(r)?),
            "LocalVariableTable" => {
                AttributeInfo::LocalVariableTable(parse_local_variable_table(r)?)
            }
            "LocalVariableTypeTable" => {
                AttributeInfo::LocalVariableTypeTable(parse_local_variable_type_table(r)?)
            }
            "Deprecated" => AttributeInfo::Deprecated,
            "BootstrapMethods" => {
                AttributeInfo::BootstrapMethods(parse_bootstrap_methods(r, constant_pool)?)
            }
            "ModulePackages" => {
                AttributeInfo::ModulePackages(parse_entry_table(r, constant_pool)?)
            }
            "ModuleMainClass" => {
                AttributeInfo::ModuleMainClass(required_entry(r, constant_pool)?.clone())
            }
            "NestHost" => AttributeInfo::NestHost(required_entry(r, constant_pool)?.clone()),
            // Names outside the predefined set are implementation-specific;
            // their bodies are kept verbatim.
            _ => AttributeInfo::Unknown(r.read_remaining().to_vec()),
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, PartialEq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, PartialEq)]
pub struct LocalVariableType {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub signature_index: u16,
    pub index: u16,
}

#[derive(Debug, PartialEq)]
pub struct InnerClass {
    pub inner_class: CpInfo,
    pub outer_class: Option<CpInfo>,
    pub inner_name: Option<CpInfo>,
    pub access_flags: InnerClassAccessFlags,
}

#[derive(Debug, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: Option<CpInfo>,
}

#[derive(Debug, PartialEq)]
pub struct BootstrapMethod {
    pub method: CpInfo,
    pub arguments: Vec<CpInfo>,
}

#[derive(PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}
impl fmt::Debug for CodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAttribute")
            .field("max_stack", &self.max_stack)
            .field("max_locals", &self.max_locals)
            .field("code", &format!("({} bytes)", self.code.len()))
            .field("exception_table", &self.exception_table)
            .field("attributes", &self.attributes)
            .finish()
    }
}

fn parse_code(
    r: &mut Reader<'_>,
    constant_pool: &ConstantPool,
    depth: usize,
) -> Result<CodeAttribute> {
    if depth >= MAX_ATTRIBUTE_NESTING {
        return Err(ClassFileError::AttributeNestingTooDeep(MAX_ATTRIBUTE_NESTING));
    }

    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let code_length = r.read_u32()?;
    let code = r.read_bytes(code_length as usize)?.to_vec();

    let exception_table_length = r.read_u16()?;
    let exception_table = (0..exception_table_length)
        .map(|_| parse_exception_table_entry(r, constant_pool))
        .collect::<Result<Vec<_>>>()?;

    let attributes_count = r.read_u16()?;
    let attributes = (0..attributes_count)
        .map(|_| Attribute::parse_at_depth(r, constant_pool, depth + 1))
        .collect::<Result<Vec<_>>>()
        .map(Attributes)?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    })
}

fn parse_exception_table_entry(
    r: &mut Reader<'_>,
    constant_pool: &ConstantPool,
) -> Result<ExceptionTableEntry> {
    let start_pc = r.read_u16()?;
    let end_pc = r.read_u16()?;
    let handler_pc = r.read_u16()?;
    // If the value of the catch_type item is zero, this exception handler
    // is called for all exceptions.
    let catch_type = optional_entry(r, constant_pool)?.cloned();

    Ok(ExceptionTableEntry {
        start_pc,
        end_pc,
        handler_pc,
        catch_type,
    })
}

fn parse_inner_classes(
    r: &mut Reader<'_>,
    constant_pool: &ConstantPool,
) -> Result<Vec<InnerClass>> {
    let number_of_classes = r.read_u16()?;
    (0..number_of_classes)
        .map(|_| {
            let inner_class = required_entry(r, constant_pool)?.clone();
            // Both indices are zero for local and anonymous classes
            let outer_class = optional_entry(r, constant_pool)?.cloned();
            let inner_name = optional_entry(r, constant_pool)?.cloned();
            let access_flags = InnerClassAccessFlags::from_bits_truncate(r.read_u16()?);

            Ok(InnerClass {
                inner_class,
                outer_class,
                inner_name,
                access_flags,
            })
        })
        .collect()
}

fn parse_line_number_table(r: &mut Reader<'_>) -> Result<Vec<LineNumber>> {
    let line_number_table_length = r.read_u16()?;
    (0..line_number_table_length)
        .map(|_| {
            let start_pc = r.read_u16()?;
            let line_number = r.read_u16()?;

            Ok(LineNumber {
                start_pc,
                line_number,
            })
        })
        .collect()
}

fn parse_local_variable_table(r: &mut Reader<'_>) -> Result<Vec<LocalVariable>> {
    let local_variable_table_length = r.read_u16()?;
    (0..local_variable_table_length)
        .map(|_| {
            let start_pc = r.read_u16()?;
            let length = r.read_u16()?;
            let name_index = r.read_u16()?;
            let descriptor_index = r.read_u16()?;
            let index = r.read_u16()?;

            Ok(LocalVariable {
                start_pc,
                length,
                name_index,
                descriptor_index,
                index,
            })
        })
        .collect()
}

fn parse_local_variable_type_table(r: &mut Reader<'_>) -> Result<Vec<LocalVariableType>> {
    let local_variable_type_table_length = r.read_u16()?;
    (0..local_variable_type_table_length)
        .map(|_| {
            let start_pc = r.read_u16()?;
            let length = r.read_u16()?;
            let name_index = r.read_u16()?;
            let signature_index = r.read_u16()?;
            let index = r.read_u16()?;

            Ok(LocalVariableType {
                start_pc,
                length,
                name_index,
                signature_index,
                index,
            })
        })
        .collect()
}

fn parse_bootstrap_methods(
    r: &mut Reader<'_>,
    constant_pool: &ConstantPool,
) -> Result<Vec<BootstrapMethod>> {
    let num_bootstrap_methods = r.read_u16()?;
    (0..num_bootstrap_methods)
        .map(|_| {
            let method = required_entry(r, constant_pool)?.clone();
            let num_bootstrap_arguments = r.read_u16()?;
            // Argument order is what invokedynamic call sites see; keep it
            let arguments = (0..num_bootstrap_arguments)
                .map(|_| required_entry(r, constant_pool).map(|e| e.clone()))
                .collect::<Result<Vec<_>>>()?;

            Ok(BootstrapMethod { method, arguments })
        })
        .collect()
}

fn parse_index_table(r: &mut Reader<'_>) -> Result<Vec<u16>> {
    let count = r.read_u16()?;
    (0..count).map(|_| r.read_u16()).collect()
}

fn parse_entry_table(r: &mut Reader<'_>, constant_pool: &ConstantPool) -> Result<Vec<CpInfo>> {
    let count = r.read_u16()?;
    (0..count)
        .map(|_| required_entry(r, constant_pool).map(|e| e.clone()))
        .collect()
}

fn required_entry<'p>(r: &mut Reader<'_>, constant_pool: &'p ConstantPool) -> Result<&'p CpInfo> {
    constant_pool.get(r.read_u16()?)
}

fn optional_entry<'p>(
    r: &mut Reader<'_>,
    constant_pool: &'p ConstantPool,
) -> Result<Option<&'p CpInfo>> {
    constant_pool.get_optional(r.read_u16()?)
}

fn utf8_entry(r: &mut Reader<'_>, constant_pool: &ConstantPool) -> Result<Arc<str>> {
    let index = r.read_u16()?;

    Ok(Arc::clone(matches_cp_info!(constant_pool, index, Utf8)?))
}

#[cfg(test)]
fn attribute_bytes(name_index: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![];
    bytes.extend_from_slice(&name_index.to_be_bytes());
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

#[cfg(test)]
fn root_cause(err: &ClassFileError) -> &ClassFileError {
    match err {
        ClassFileError::AttributeDecode { source, .. } => root_cause(source),
        other => other,
    }
}


#[cfg(test)]
mod code_attribute_tests {
    use super::*;
    use crate::constant_pool::ClassInfo;

    fn test_pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("Code".into()),                 // 1
            CpInfo::Utf8("LineNumberTable".into()),      // 2
            CpInfo::Class(ClassInfo { name_index: 4 }),  // 3
            CpInfo::Utf8("java/lang/Exception".into()),  // 4
        ])
    }

    fn code_bytes(exception_table: &[u8], exception_count: u16, nested: &[u8]) -> Vec<u8> {
        let mut body = vec![
            0x00, 0x02, // max_stack
            0x00, 0x03, // max_locals
            0x00, 0x00, 0x00, 0x03, // code_length
            0x1b, 0x86, 0xae, // iload_1, i2f, freturn
        ];
        let attributes_count: u16 = if nested.is_empty() { 0 } else { 1 };
        body.extend_from_slice(&exception_count.to_be_bytes());
        body.extend_from_slice(exception_table);
        body.extend_from_slice(&attributes_count.to_be_bytes());
        body.extend_from_slice(nested);
        attribute_bytes(1, &body)
    }

    #[test]
    fn it_should_decode_nested_attributes() {
        let bytes = code_bytes(
            &[],
            0,
            &attribute_bytes(2, &[0x00, 0x01, 0x00, 0x00, 0x00, 0x07]),
        );
        let attribute = Attribute::parse(&mut Reader::new(&bytes), &test_pool()).unwrap();

        let AttributeInfo::Code(ref code) = attribute.info else {
            panic!("expected a code attribute, got {:?}", attribute.info);
        };
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 3);
        assert_eq!(code.code, [0x1b, 0x86, 0xae]);
        assert_eq!(code.attributes.0.len(), 1);
        assert_eq!(
            code.attributes.0[0].info,
            AttributeInfo::LineNumberTable(vec![LineNumber {
                start_pc: 0,
                line_number: 7,
            }])
        );
    }

    #[test]
    fn it_should_treat_catch_type_zero_as_catch_all() {
        let bytes = code_bytes(
            &[
                0x00, 0x00, 0x00, 0x03, 0x00, 0x03, 0x00, 0x03, // catches entry 3
                0x00, 0x00, 0x00, 0x03, 0x00, 0x03, 0x00, 0x00, // catches anything
            ],
            2,
            &[],
        );
        let attribute = Attribute::parse(&mut Reader::new(&bytes), &test_pool()).unwrap();

        let AttributeInfo::Code(ref code) = attribute.info else {
            panic!("expected a code attribute, got {:?}", attribute.info);
        };
        assert_eq!(
            code.exception_table[0].catch_type,
            Some(CpInfo::Class(ClassInfo { name_index: 4 }))
        );
        assert_eq!(code.exception_table[1].catch_type, None);
    }

    #[test]
    fn it_should_fail_if_a_nested_attribute_overruns_its_length() {
        // the nested attribute claims 9 body bytes but the code body ends
        // after two
        let bytes = code_bytes(&[], 0, &[0x00, 0x02, 0x00, 0x00, 0x00, 0x09, 0xff, 0xff]);
        let err = Attribute::parse(&mut Reader::new(&bytes), &test_pool()).unwrap_err();

        assert!(matches!(
            root_cause(&err),
            ClassFileError::TruncatedInput { .. }
        ));
    }

    #[test]
    fn it_should_cap_the_code_nesting_depth() {
        let mut bytes = code_bytes(&[], 0, &[]);
        for _ in 0..MAX_ATTRIBUTE_NESTING {
            bytes = code_bytes(&[], 0, &bytes);
        }
        let err = Attribute::parse(&mut Reader::new(&bytes), &test_pool()).unwrap_err();

        assert!(matches!(
            root_cause(&err),
            ClassFileError::AttributeNestingTooDeep(_)
        ));
    }
}
