//! Graphviz export of method flow graphs

use std::fmt::Write;

use crate::ir::{Body, Program, Transfer};

/// Render one body as a `digraph`. Nodes are blocks, listing their
/// statements; `If` edges are labelled `T`/`F`.
pub fn body_to_dot(name: &str, body: &Body) -> String {
    let mut out = String::new();
    writeln!(out, "digraph \"{}\" {{", escape(name)).unwrap();
    writeln!(out, "\tsize = \"10, 10\";").unwrap();
    writeln!(out, "\tnode [shape=box, color=lightblue2, style=filled];").unwrap();

    for block in body.blocks() {
        let mut text = format!("{}:\\l", block.label);
        for (_, stm) in body.block_stms(block) {
            write!(text, "  {}\\l", escape(&stm.to_string())).unwrap();
        }
        write!(text, "  {}\\l", escape(&block.transfer.to_string())).unwrap();
        writeln!(out, "\t\"{}\" [label=\"{}\"];", block.label, text).unwrap();
    }

    for block in body.blocks() {
        match &block.transfer {
            Transfer::Goto(target) => {
                writeln!(out, "\t\"{}\" -> \"{}\";", block.label, target).unwrap();
            }
            Transfer::If { then_label, else_label, .. } => {
                let from = block.label;
                writeln!(out, "\t\"{}\" -> \"{}\" [label=\"T\"];", from, then_label).unwrap();
                writeln!(out, "\t\"{}\" -> \"{}\" [label=\"F\"];", from, else_label).unwrap();
            }
            Transfer::Return(_) => {}
        }
    }

    writeln!(out, "}}").unwrap();
    out
}

/// One `digraph` per method body, main first
pub fn program_to_dot(program: &Program) -> String {
    let methods = program.methods.iter().map(|m| body_to_dot(&m.qualified_name(), &m.body));
    std::iter::once(body_to_dot("main", &program.main.body))
        .chain(methods)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Label, Operand, RawBlock, Stm};

    #[test]
    fn test_branch_edges_are_labelled() {
        let body = Body::from_blocks(vec![
            RawBlock::new(
                Label(0),
                vec![],
                Transfer::branch(Operand::var("c"), Label(1), Label(2)),
            ),
            RawBlock::new(
                Label(1),
                vec![Stm::print(Operand::str("yes"))],
                Transfer::Goto(Label(2)),
            ),
            RawBlock::new(Label(2), vec![], Transfer::Return(Operand::Int(0))),
        ])
        .unwrap();
        let dot = body_to_dot("main", &body);

        assert!(dot.starts_with("digraph \"main\" {"));
        assert!(dot.contains("\"L_0\" -> \"L_1\" [label=\"T\"];"));
        assert!(dot.contains("\"L_0\" -> \"L_2\" [label=\"F\"];"));
        assert!(dot.contains("\"L_1\" -> \"L_2\";"));
        assert!(dot.contains("print \\\"yes\\\""));
        assert!(dot.trim_end().ends_with('}'));
    }
}
