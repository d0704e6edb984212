//! Constant and copy propagation driven by reaching definitions

use log::debug;
use rustc_hash::FxHashSet;

use super::{Pass, PassOutcome};
use crate::dataflow::ReachingDefs;
use crate::error::CfgResult;
use crate::ir::{Body, Operand, PerMethod, Program, RawBlock, Stm, StmId, UseSite};

/// Replace each variable use whose only reaching definition is a `Move`
/// with that move's source.
///
/// Uses in transfers are rewritten as well; destinations never are.
/// Constant sources are substituted wherever they reach. A variable source
/// is only substituted when the copy precedes the use in the same block
/// with no redefinition of the source in between, or when the method never
/// assigns the source at all. Name slots only take variable sources.
///
/// `fields` are the fields of `this` the body can name. Any virtual call
/// may rewrite them, so a field is only trusted (as the used name or as a
/// copy source) when its defining move sits earlier in the same block with
/// no call in between.
///
/// One round; the result may expose further copies. Returns the new body
/// and the number of uses rewritten.
pub fn propagate_copies(
    body: &Body,
    reaching: &ReachingDefs,
    fields: &FxHashSet<String>,
) -> CfgResult<(Body, usize)> {
    let mut rewritten = 0;
    let mut blocks = Vec::with_capacity(body.block_count());

    for (b, block) in body.blocks().iter().enumerate() {
        let mut stms = Vec::with_capacity(block.stms.len());
        for (pos, (id, stm)) in body.block_stms(block).enumerate() {
            let at = UsePoint { block: b, pos, reaching: reaching.reaching_in(id)?, fields };
            stms.push(stm.map_uses(|op, site| rewrite(body, &at, op, site, &mut rewritten)));
        }
        let at = UsePoint {
            block: b,
            pos: block.stms.len(),
            reaching: reaching.transfer_in(b),
            fields,
        };
        let transfer = block
            .transfer
            .map_uses(|op| rewrite(body, &at, op, UseSite::Operand, &mut rewritten));
        blocks.push(RawBlock::new(block.label, stms, transfer));
    }

    Ok((Body::from_blocks(blocks)?, rewritten))
}

/// A use site: block index, position within the block (the transfer sits
/// after the last statement), and the definitions reaching it
struct UsePoint<'r> {
    block: usize,
    pos: usize,
    reaching: &'r FxHashSet<StmId>,
    fields: &'r FxHashSet<String>,
}

fn rewrite(
    body: &Body,
    at: &UsePoint<'_>,
    op: &Operand,
    site: UseSite,
    rewritten: &mut usize,
) -> Operand {
    match copy_source(body, at, op) {
        Some(src) if site == UseSite::Operand || src.as_var().is_some() => {
            if src != op {
                *rewritten += 1;
            }
            src.clone()
        }
        _ => op.clone(),
    }
}

/// The source of the unique `Move` defining `op` at this point, if any
fn copy_source<'b>(body: &'b Body, at: &UsePoint<'_>, op: &Operand) -> Option<&'b Operand> {
    let name = op.as_var()?;
    let def = unique_def(body, at.reaching, name)?;
    let Stm::Move { src, .. } = body.stm(def) else {
        return None;
    };
    if at.fields.contains(name) && !unchanged_since(body, at, def, name) {
        return None;
    }

    match src {
        Operand::Var(source) if !unchanged_since(body, at, def, source) => None,
        _ => Some(src),
    }
}

/// True when `name` holds the same value at `at` as it did right after
/// `since`
fn unchanged_since(body: &Body, at: &UsePoint<'_>, since: StmId, name: &str) -> bool {
    let block = body.block(at.block);
    let field = at.fields.contains(name);
    let clobbers = |id: &StmId| {
        let stm = body.stm(*id);
        stm.dst() == Some(name) || (field && matches!(stm, Stm::InvokeVirtual { .. }))
    };

    match block.stms[..at.pos].iter().position(|id| *id == since) {
        Some(start) => !block.stms[start + 1..at.pos].iter().any(clobbers),
        None => !field && !body.statements().any(|(_, stm)| stm.dst() == Some(name)),
    }
}

fn unique_def(body: &Body, reaching: &FxHashSet<StmId>, name: &str) -> Option<StmId> {
    let mut defs = reaching
        .iter()
        .copied()
        .filter(|id| body.get_stm(*id).and_then(Stm::dst) == Some(name));
    let def = defs.next()?;
    match defs.next() {
        Some(_) => None,
        None => Some(def),
    }
}

/// Constant/copy propagation over every method of a program
pub struct ConstantPropagation<'a> {
    reaching: &'a PerMethod<ReachingDefs>,
}

impl<'a> ConstantPropagation<'a> {
    pub fn new(reaching: &'a PerMethod<ReachingDefs>) -> Self {
        ConstantPropagation { reaching }
    }
}

impl Pass for ConstantPropagation<'_> {
    fn name(&self) -> &'static str {
        "constant-propagation"
    }

    fn run(&self, program: &Program) -> CfgResult<PassOutcome> {
        let mut changes = 0;
        let program = program.try_map_bodies(|method, body| -> CfgResult<Body> {
            let fields = program.fields_in_scope(method);
            let (body, rewritten) = propagate_copies(body, self.reaching.get(method)?, &fields)?;
            if rewritten > 0 {
                debug!("{}: rewrote {} uses", method, rewritten);
            }
            changes += rewritten;
            Ok(body)
        })?;
        Ok(PassOutcome { program, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Label, Transfer, Type};

    fn run(raw: Vec<RawBlock>) -> (Vec<RawBlock>, usize) {
        run_with_fields(raw, &[])
    }

    fn run_with_fields(raw: Vec<RawBlock>, fields: &[&str]) -> (Vec<RawBlock>, usize) {
        let body = Body::from_blocks(raw).unwrap();
        let rd = ReachingDefs::compute(&body).unwrap();
        let fields = fields.iter().map(|f| f.to_string()).collect();
        let (out, n) = propagate_copies(&body, &rd, &fields).unwrap();
        (out.to_raw_blocks(), n)
    }

    fn call_bump() -> Stm {
        Stm::InvokeVirtual {
            dst: "r".into(),
            ty: Type::Int,
            receiver: "this".into(),
            method: "bump".into(),
            args: vec![],
        }
    }

    #[test]
    fn test_constant_reaches_use() {
        let (out, n) = run(vec![RawBlock::new(
            Label(0),
            vec![Stm::mov("a", 5), Stm::binop("b", BinOp::Add, Operand::var("a"), 1)],
            Transfer::Return(Operand::var("b")),
        )]);
        assert_eq!(n, 1);
        assert_eq!(out[0].stms[1], Stm::binop("b", BinOp::Add, 5, 1));
        assert_eq!(out[0].transfer, Transfer::Return(Operand::var("b")));
    }

    #[test]
    fn test_transfer_operand_is_rewritten() {
        let (out, n) = run(vec![RawBlock::new(
            Label(0),
            vec![Stm::mov("r", 3)],
            Transfer::Return(Operand::var("r")),
        )]);
        assert_eq!(n, 1);
        assert_eq!(out[0].transfer, Transfer::Return(Operand::Int(3)));
    }

    #[test]
    fn test_non_move_definition_is_left_alone() {
        let (out, n) = run(vec![RawBlock::new(
            Label(0),
            vec![Stm::binop("a", BinOp::Add, 1, 2), Stm::print(Operand::var("a"))],
            Transfer::Return(Operand::Int(0)),
        )]);
        assert_eq!(n, 0);
        assert_eq!(out[0].stms[1], Stm::print(Operand::var("a")));
    }

    #[test]
    fn test_clobbered_copy_source_is_not_substituted() {
        // a = 5; b = a; a = 6; print b
        let (out, _) = run(vec![RawBlock::new(
            Label(0),
            vec![
                Stm::mov("a", 5),
                Stm::mov("b", Operand::var("a")),
                Stm::mov("a", 6),
                Stm::print(Operand::var("b")),
            ],
            Transfer::Return(Operand::Int(0)),
        )]);
        assert_eq!(out[0].stms[1], Stm::mov("b", 5));
        assert_eq!(out[0].stms[3], Stm::print(Operand::var("b")));
    }

    #[test]
    fn test_copy_is_not_carried_past_a_possible_redefinition() {
        // L_1: b = a; if c then L_2 else L_3
        // L_2: a = a + 1
        // L_3: print b; if c then L_1 else L_4
        let (out, _) = run(vec![
            RawBlock::new(
                Label(0),
                vec![Stm::mov("a", 0), Stm::mov("c", 1)],
                Transfer::Goto(Label(1)),
            ),
            RawBlock::new(
                Label(1),
                vec![Stm::mov("b", Operand::var("a"))],
                Transfer::branch(Operand::var("c"), Label(2), Label(3)),
            ),
            RawBlock::new(
                Label(2),
                vec![Stm::binop("a", BinOp::Add, Operand::var("a"), 1)],
                Transfer::Goto(Label(3)),
            ),
            RawBlock::new(
                Label(3),
                vec![Stm::print(Operand::var("b"))],
                Transfer::branch(Operand::var("c"), Label(1), Label(4)),
            ),
            RawBlock::new(Label(4), vec![], Transfer::Return(Operand::Int(0))),
        ]);
        assert_eq!(out[3].stms[0], Stm::print(Operand::var("b")));
    }

    #[test]
    fn test_never_assigned_source_crosses_blocks() {
        // n is a formal: b = n; goto L_1; L_1: print b
        let (out, n) = run(vec![
            RawBlock::new(
                Label(0),
                vec![Stm::mov("b", Operand::var("n"))],
                Transfer::Goto(Label(1)),
            ),
            RawBlock::new(
                Label(1),
                vec![Stm::print(Operand::var("b"))],
                Transfer::Return(Operand::Int(0)),
            ),
        ]);
        assert_eq!(n, 1);
        assert_eq!(out[1].stms[0], Stm::print(Operand::var("n")));
    }

    #[test]
    fn test_receiver_takes_only_variable_copies() {
        let call = |receiver: &str| Stm::InvokeVirtual {
            dst: "r".into(),
            ty: Type::Int,
            receiver: receiver.into(),
            method: "get".into(),
            args: vec![Operand::var("k")],
        };
        let (out, n) = run(vec![RawBlock::new(
            Label(0),
            vec![
                Stm::NewObject { dst: "o".into(), class_id: "A".into() },
                Stm::Move { dst: "p".into(), ty: Type::class("A"), src: Operand::var("o") },
                Stm::mov("k", 2),
                call("p"),
            ],
            Transfer::Return(Operand::var("r")),
        )]);
        assert_eq!(n, 2);
        assert_eq!(
            out[0].stms[3],
            Stm::InvokeVirtual {
                dst: "r".into(),
                ty: Type::Int,
                receiver: "o".into(),
                method: "get".into(),
                args: vec![Operand::Int(2)],
            }
        );
    }

    #[test]
    fn test_field_source_is_not_carried_past_a_call() {
        // b = count; r = this.bump(); print b
        let (out, n) = run_with_fields(
            vec![RawBlock::new(
                Label(0),
                vec![
                    Stm::mov("b", Operand::var("count")),
                    call_bump(),
                    Stm::print(Operand::var("b")),
                ],
                Transfer::Return(Operand::Int(0)),
            )],
            &["count"],
        );
        assert_eq!(n, 0);
        assert_eq!(out[0].stms[2], Stm::print(Operand::var("b")));
    }

    #[test]
    fn test_field_source_without_a_call_is_substituted() {
        // b = count; print b
        let (out, n) = run_with_fields(
            vec![RawBlock::new(
                Label(0),
                vec![Stm::mov("b", Operand::var("count")), Stm::print(Operand::var("b"))],
                Transfer::Return(Operand::Int(0)),
            )],
            &["count"],
        );
        assert_eq!(n, 1);
        assert_eq!(out[0].stms[1], Stm::print(Operand::var("count")));
    }

    #[test]
    fn test_field_constant_is_not_carried_past_a_call() {
        // count = 5; r = this.bump(); print count
        let (out, n) = run_with_fields(
            vec![RawBlock::new(
                Label(0),
                vec![Stm::mov("count", 5), call_bump(), Stm::print(Operand::var("count"))],
                Transfer::Return(Operand::Int(0)),
            )],
            &["count"],
        );
        assert_eq!(n, 0);
        assert_eq!(out[0].stms[2], Stm::print(Operand::var("count")));
    }

    #[test]
    fn test_field_source_never_crosses_blocks() {
        // b = count; goto L_1; L_1: print b
        let (out, n) = run_with_fields(
            vec![
                RawBlock::new(
                    Label(0),
                    vec![Stm::mov("b", Operand::var("count"))],
                    Transfer::Goto(Label(1)),
                ),
                RawBlock::new(
                    Label(1),
                    vec![Stm::print(Operand::var("b"))],
                    Transfer::Return(Operand::Int(0)),
                ),
            ],
            &["count"],
        );
        assert_eq!(n, 0);
        assert_eq!(out[1].stms[0], Stm::print(Operand::var("b")));
    }
}
