//! Lowering of structured control flow to token streams
//!
//! Translators hand a method body over as a small tree of straight-line
//! statements, conditionals and loops. Lowering flattens it into the token
//! stream the block builder consumes:
//!
//! ```text
//! if:     <test>; if c then tl else fl; fl: <else>; goto el; tl: <then>; goto el; el:
//! while:  wl: <test>; if c then bl else el; bl: <body>; goto wl; el:
//! ```

use crate::ir::{Label, Operand, Stm, Transfer};
use crate::token::{FreshNames, Token};

/// A structured method body
#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    Stm(Stm),
    Seq(Vec<Structured>),
    /// `test` computes `cond`; non-zero takes `then_branch`
    If {
        test: Vec<Stm>,
        cond: Operand,
        then_branch: Box<Structured>,
        else_branch: Box<Structured>,
    },
    /// `test` is re-evaluated before every iteration
    While {
        test: Vec<Stm>,
        cond: Operand,
        body: Box<Structured>,
    },
}

impl Structured {
    pub fn if_else(
        test: Vec<Stm>,
        cond: impl Into<Operand>,
        then_branch: Structured,
        else_branch: Structured,
    ) -> Self {
        Structured::If {
            test,
            cond: cond.into(),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn while_loop(test: Vec<Stm>, cond: impl Into<Operand>, body: Structured) -> Self {
        Structured::While { test, cond: cond.into(), body: Box::new(body) }
    }

    /// Labels this tree allocates when lowered
    pub fn label_count(&self) -> usize {
        match self {
            Structured::Stm(_) => 0,
            Structured::Seq(items) => items.iter().map(Structured::label_count).sum(),
            Structured::If { then_branch, else_branch, .. } => {
                3 + then_branch.label_count() + else_branch.label_count()
            }
            Structured::While { body, .. } => 3 + body.label_count(),
        }
    }

    /// Control edges this tree adds to the lowered graph
    pub fn edge_count(&self) -> usize {
        match self {
            Structured::Stm(_) => 0,
            Structured::Seq(items) => items.iter().map(Structured::edge_count).sum(),
            // branch, two gotos into the join
            Structured::If { then_branch, else_branch, .. } => {
                4 + then_branch.edge_count() + else_branch.edge_count()
            }
            // fall into header, branch, back edge
            Structured::While { body, .. } => 4 + body.edge_count(),
        }
    }
}

impl From<Stm> for Structured {
    fn from(stm: Stm) -> Self {
        Structured::Stm(stm)
    }
}

/// Token emitter for one method
pub struct Lowering<'n> {
    names: &'n mut FreshNames,
    tokens: Vec<Token>,
}

impl<'n> Lowering<'n> {
    pub fn new(names: &'n mut FreshNames) -> Self {
        Lowering { names, tokens: Vec::new() }
    }

    pub fn emit(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn emit_label(&mut self) -> Label {
        let label = self.names.label();
        self.emit(Token::Label(label));
        label
    }

    pub fn lower(&mut self, tree: &Structured) {
        match tree {
            Structured::Stm(stm) => self.emit(Token::Stm(stm.clone())),
            Structured::Seq(items) => {
                for item in items {
                    self.lower(item);
                }
            }
            Structured::If { test, cond, then_branch, else_branch } => {
                let (tl, fl, el) = (self.names.label(), self.names.label(), self.names.label());
                self.emit_stms(test);
                self.emit(Token::Transfer(Transfer::branch(cond.clone(), tl, fl)));
                self.emit(Token::Label(fl));
                self.lower(else_branch);
                self.emit(Token::Transfer(Transfer::Goto(el)));
                self.emit(Token::Label(tl));
                self.lower(then_branch);
                self.emit(Token::Transfer(Transfer::Goto(el)));
                self.emit(Token::Label(el));
            }
            Structured::While { test, cond, body } => {
                let (wl, bl, el) = (self.names.label(), self.names.label(), self.names.label());
                self.emit(Token::Label(wl));
                self.emit_stms(test);
                self.emit(Token::Transfer(Transfer::branch(cond.clone(), bl, el)));
                self.emit(Token::Label(bl));
                self.lower(body);
                self.emit(Token::Transfer(Transfer::Goto(wl)));
                self.emit(Token::Label(el));
            }
        }
    }

    fn emit_stms(&mut self, stms: &[Stm]) {
        self.tokens.extend(stms.iter().cloned().map(Token::Stm));
    }

    pub fn finish(self) -> Vec<Token> {
        self.tokens
    }
}

/// Lower a whole method: entry label, body, `Return(ret)`
pub fn lower_method(body: &Structured, ret: Operand, names: &mut FreshNames) -> Vec<Token> {
    let mut lowering = Lowering::new(names);
    lowering.emit_label();
    lowering.lower(body);
    lowering.emit(Token::Transfer(Transfer::Return(ret)));
    lowering.finish()
}
