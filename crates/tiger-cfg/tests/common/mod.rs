//! Shared helpers for tiger-cfg integration tests
#![allow(dead_code)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use tiger_cfg::{
    build_body, lower_method, BinOp, Body, FreshNames, Label, Operand, Program, RawBlock, Stm,
    Structured, Transfer,
};

/// Variables random programs read and write
pub const VARS: &[&str] = &["a", "b", "c", "d"];

pub fn body(blocks: Vec<RawBlock>) -> Body {
    Body::from_blocks(blocks).expect("well-formed test body")
}

pub fn block(label: u32, stms: Vec<Stm>, transfer: Transfer) -> RawBlock {
    RawBlock::new(Label(label), stms, transfer)
}

pub fn ret0() -> Transfer {
    Transfer::Return(Operand::Int(0))
}

pub fn var(name: &str) -> Operand {
    Operand::var(name)
}

/// Statements of every block of `main`, in order
pub fn main_stms(program: &Program) -> Vec<Stm> {
    program
        .main
        .body
        .to_raw_blocks()
        .into_iter()
        .flat_map(|block| block.stms)
        .collect()
}

/// Rewrite every `While` into a counted loop on a fresh counter, so that
/// random programs always terminate. The loop's `cond` is taken as the
/// iteration bound.
pub fn counted(tree: Structured, loops: &mut usize) -> Structured {
    match tree {
        Structured::While { cond, body, .. } => {
            let counter = format!("i{}", loops);
            let test = format!("k{}", loops);
            *loops += 1;
            let body = counted(*body, loops);
            Structured::Seq(vec![
                Stm::mov(counter.as_str(), 0).into(),
                Structured::while_loop(
                    vec![Stm::binop(test.as_str(), BinOp::Lt, var(&counter), cond)],
                    var(&test),
                    Structured::Seq(vec![
                        body,
                        Stm::binop(counter.as_str(), BinOp::Add, var(&counter), 1).into(),
                    ]),
                ),
            ])
        }
        Structured::If { test, cond, then_branch, else_branch } => Structured::If {
            test,
            cond,
            then_branch: Box::new(counted(*then_branch, loops)),
            else_branch: Box::new(counted(*else_branch, loops)),
        },
        Structured::Seq(items) => {
            Structured::Seq(items.into_iter().map(|item| counted(item, loops)).collect())
        }
        stm => stm,
    }
}

/// Wrap a random tree into a runnable `main`: every variable is
/// initialized up front and printed at the end.
pub fn program_from(tree: &Structured) -> Program {
    let mut loops = 0;
    let mut items: Vec<Structured> = VARS
        .iter()
        .zip(1..)
        .map(|(name, value)| Stm::mov(*name, value).into())
        .collect();
    items.push(counted(tree.clone(), &mut loops));
    items.extend(VARS.iter().map(|name| Stm::print(var(name)).into()));

    let mut names = FreshNames::new();
    let tokens = lower_method(&Structured::Seq(items), Operand::Int(0), &mut names);
    Program::from_main(build_body(tokens).expect("lowering yields a well-formed body"))
}

/// The `(from, to)` label pairs lowering `tree` with a fresh name supply
/// must produce. Labels are handed out in lowering order: `L_0` for the
/// entry, then (then, else, join) per `If` and (header, body, exit) per
/// `While`.
pub fn expected_edges(tree: &Structured) -> BTreeSet<(Label, Label)> {
    let mut walk = EdgeWalk { next: 1, current: Label(0), edges: BTreeSet::new() };
    walk.walk(tree);
    walk.edges
}

struct EdgeWalk {
    next: u32,
    current: Label,
    edges: BTreeSet<(Label, Label)>,
}

impl EdgeWalk {
    fn fresh(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }

    fn jump(&mut self, to: Label) {
        self.edges.insert((self.current, to));
    }

    fn walk(&mut self, tree: &Structured) {
        match tree {
            Structured::Stm(_) => {}
            Structured::Seq(items) => {
                for item in items {
                    self.walk(item);
                }
            }
            Structured::If { then_branch, else_branch, .. } => {
                let (then_label, else_label, join) = (self.fresh(), self.fresh(), self.fresh());
                self.jump(then_label);
                self.jump(else_label);
                self.current = else_label;
                self.walk(else_branch);
                self.jump(join);
                self.current = then_label;
                self.walk(then_branch);
                self.jump(join);
                self.current = join;
            }
            Structured::While { body, .. } => {
                let (header, body_label, exit) = (self.fresh(), self.fresh(), self.fresh());
                // fall-through into the header
                self.jump(header);
                self.current = header;
                self.jump(body_label);
                self.jump(exit);
                self.current = body_label;
                self.walk(body);
                self.jump(header);
                self.current = exit;
            }
        }
    }
}

// =============================================================================
// Strategies
// =============================================================================

pub fn arb_var() -> impl Strategy<Value = &'static str> {
    prop::sample::select(VARS)
}

pub fn arb_operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        (-5i32..10).prop_map(Operand::Int),
        arb_var().prop_map(Operand::var),
    ]
}

pub fn arb_binop() -> impl Strategy<Value = BinOp> {
    prop::sample::select(vec![
        BinOp::Add,
        BinOp::Sub,
        BinOp::Times,
        BinOp::And,
        BinOp::Lt,
        BinOp::Le,
        BinOp::Eq,
    ])
}

pub fn arb_stm() -> impl Strategy<Value = Stm> {
    prop_oneof![
        3 => (arb_var(), arb_operand()).prop_map(|(dst, src)| Stm::mov(dst, src)),
        3 => (arb_var(), arb_binop(), arb_operand(), arb_operand())
            .prop_map(|(dst, op, left, right)| Stm::binop(dst, op, left, right)),
        1 => arb_operand().prop_map(Stm::print),
    ]
}

/// Random structured bodies. `While` nodes carry their iteration bound in
/// `cond`; run them through [`program_from`] before lowering.
pub fn arb_structured() -> impl Strategy<Value = Structured> {
    let leaf = arb_stm().prop_map(Structured::Stm);
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Structured::Seq),
            (arb_operand(), arb_operand(), inner.clone(), inner.clone()).prop_map(
                |(left, right, then_branch, else_branch)| {
                    Structured::if_else(
                        vec![Stm::binop("cond", BinOp::Lt, left, right)],
                        var("cond"),
                        then_branch,
                        else_branch,
                    )
                }
            ),
            (0i32..4, inner).prop_map(|(bound, body)| Structured::while_loop(vec![], bound, body)),
        ]
    })
}
