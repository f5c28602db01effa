//! Rust source generation for aggregators and the root module.
//!
//! Generated aggregators are plain Rust that the source scanner can read
//! back, which is how later rounds find them.

use crate::models::{
    AggregatorSpec, RootSpec, AGGREGATOR_ATTRIBUTE, ROOT_ATTRIBUTE, ROOT_MODULE_NAME,
};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// @generated by modindex. Do not edit.";

/// Generate the source of an aggregator.
pub fn generate_aggregator_source(spec: &AggregatorSpec) -> String {
    let mut output = String::new();
    let type_name = spec.type_name();
    let modules = spec.module_names();

    output.push_str(&generate_header(spec.round));

    output.push_str(&format!(
        "#[{}(modules = [{}])]\n",
        AGGREGATOR_ATTRIBUTE,
        quoted_list(&modules)
    ));
    output.push_str("#[allow(non_camel_case_types)]\n");
    output.push_str(&format!("pub struct {};\n\n", type_name));

    output.push_str(&format!("impl {} {{\n", type_name));
    output.push_str(&generate_const("MODULES", &modules));
    output.push_str("}\n");

    output
}

/// Generate the source of the root module.
pub fn generate_root_source(spec: &RootSpec) -> String {
    let mut output = String::new();

    output.push_str(&generate_header(spec.round));

    output.push_str(&format!(
        "#[{}(root = \"{}\", modules = [{}])]\n",
        ROOT_ATTRIBUTE,
        spec.root.qualified_name,
        quoted_list(&spec.modules)
    ));
    output.push_str(&format!("pub struct {};\n\n", ROOT_MODULE_NAME));

    output.push_str(&format!("impl {} {{\n", ROOT_MODULE_NAME));
    output.push_str(&format!(
        "    pub const ROOT: &'static str = \"{}\";\n",
        spec.root.qualified_name
    ));
    output.push_str(&generate_const("MODULES", &spec.modules));
    output.push_str(&generate_const("AGGREGATORS", &spec.aggregators));
    output.push_str("}\n");

    output
}

/// File name an aggregator is written to.
pub fn aggregator_file_name(spec: &AggregatorSpec) -> String {
    format!("{}.rs", spec.type_name())
}

/// File name the root module is written to.
pub fn root_file_name() -> String {
    "generated_root_module.rs".to_string()
}

fn generate_header(round: u32) -> String {
    format!("{}\n// Round: {}\n\n", GENERATED_HEADER, round)
}

fn generate_const(name: &str, items: &[String]) -> String {
    let mut section = String::new();

    if items.is_empty() {
        section.push_str(&format!("    pub const {}: &'static [&'static str] = &[];\n", name));
        return section;
    }

    section.push_str(&format!("    pub const {}: &'static [&'static str] = &[\n", name));
    for item in items {
        section.push_str(&format!("        \"{}\",\n", item));
    }
    section.push_str("    ];\n");

    section
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("\"{}\"", i))
        .collect::<Vec<_>>()
        .join(", ")
}
