//! Pretty-printing for the CFG IR
//!
//! Human-readable dumps of programs, methods and blocks.

use super::block::{Block, Body};
use super::program::{MainMethod, Method, Program};
use super::types::Dec;
use std::fmt::Write;

/// Trait for pretty-printing IR constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for Program {
    fn pretty_print(&self) -> String {
        let mut output = String::new();

        for class in &self.classes {
            writeln!(output, "; class {}", class.id).unwrap();
            for field in &class.fields {
                writeln!(output, ";   field {}", field).unwrap();
            }
        }
        for vtable in &self.vtables {
            let slots: Vec<String> = vtable
                .entries
                .iter()
                .map(|e| format!("{}.{}", e.owner, e.method))
                .collect();
            writeln!(output, "; vtable {} [{}]", vtable.class_id, slots.join(", ")).unwrap();
        }
        if !self.classes.is_empty() || !self.vtables.is_empty() {
            writeln!(output).unwrap();
        }

        output.push_str(&self.main.pretty_print());
        for method in &self.methods {
            writeln!(output).unwrap();
            output.push_str(&method.pretty_print());
        }
        output
    }
}

impl PrettyPrint for MainMethod {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        writeln!(output, "main() {{").unwrap();
        write_locals(&mut output, &self.locals);
        output.push_str(&self.body.pretty_print());
        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for Method {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        let formals: Vec<String> = self.formals.iter().map(|d| d.to_string()).collect();
        writeln!(
            output,
            "{} {}({}) {{",
            self.ret_ty,
            self.qualified_name(),
            formals.join(", ")
        )
        .unwrap();
        write_locals(&mut output, &self.locals);
        output.push_str(&self.body.pretty_print());
        writeln!(output, "}}").unwrap();
        output
    }
}

impl PrettyPrint for Body {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for block in self.blocks() {
            write_block(&mut output, self, block);
        }
        output
    }
}

fn write_locals(output: &mut String, locals: &[Dec]) {
    if !locals.is_empty() {
        let locals: Vec<String> = locals.iter().map(|d| d.to_string()).collect();
        writeln!(output, "  ; locals: {}", locals.join(", ")).unwrap();
    }
}

fn write_block(output: &mut String, body: &Body, block: &Block) {
    writeln!(output, "  {}:", block.label).unwrap();
    for (_, stm) in body.block_stms(block) {
        writeln!(output, "    {}", stm).unwrap();
    }
    writeln!(output, "    {}", block.transfer).unwrap();
}
