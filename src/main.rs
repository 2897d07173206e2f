use std::{env, fs, process};

use kava_class_file::{AttributeInfo, Attributes, ClassFile};

fn main() {
    pretty_env_logger::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: kava <class file>");
        process::exit(2);
    };

    let bytes = fs::read(&path).unwrap();
    let class_file = ClassFile::parse(&bytes).unwrap();

    println!("class {}", class_file.class_name().unwrap());
    if let Some(super_class) = class_file.super_class().unwrap() {
        println!("  extends {}", super_class);
    }
    for interface in &class_file.interfaces {
        println!(
            "  implements {}",
            class_file.interface_name(*interface).unwrap()
        );
    }
    println!("  minor version: {}", class_file.minor_version);
    println!("  major version: {}", class_file.major_version);
    println!("  flags: {:?}", class_file.access_flags);

    println!();
    println!("Constant pool:");
    for (i, cp_info) in (&class_file.constant_pool).into_iter().enumerate() {
        println!("  #{} = {:?}", i + 1, cp_info);
    }

    println!();
    println!("Fields:");
    for field in &class_file.fields {
        println!(
            "  {} {} [{:?}]",
            class_file.field_descriptor(field).unwrap(),
            class_file.field_name(field).unwrap(),
            field.access_flags,
        );
        print_attributes(&field.attributes, 4);
    }

    println!();
    println!("Methods:");
    for method in &class_file.methods {
        println!(
            "  {}{} [{:?}]",
            class_file.method_name(method).unwrap(),
            class_file.method_descriptor(method).unwrap(),
            method.access_flags,
        );
        print_attributes(&method.attributes, 4);
    }

    println!();
    println!("Class attributes:");
    print_attributes(&class_file.attributes, 2);
}

fn print_attributes(attributes: &Attributes, indent: usize) {
    for attribute in &attributes.0 {
        match &attribute.info {
            AttributeInfo::Code(code) => {
                println!(
                    "{:indent$}Code: stack={}, locals={}, {} bytes of bytecode",
                    "",
                    code.max_stack,
                    code.max_locals,
                    code.code.len(),
                );
                print_attributes(&code.attributes, indent + 2);
            }
            AttributeInfo::Unknown(info) => {
                log::warn!("unrecognized attribute: {}", attribute.name);
                println!("{:indent$}{}: ({} bytes)", "", attribute.name, info.len());
            }
            info => println!("{:indent$}{}: {:?}", "", attribute.name, info),
        }
    }
}
