//! Liveness-driven dead-code elimination

use log::debug;

use super::{Pass, PassOutcome};
use crate::dataflow::Liveness;
use crate::error::CfgResult;
use crate::ir::{Body, PerMethod, Program, RawBlock};

/// Drop every side-effect-free statement whose destination is dead after it.
///
/// `Print`, `InvokeVirtual` and `AssignArray` always survive. Stores to
/// fields of `this` survive as long as `liveness` was computed with the
/// method's fields (see [`Liveness::compute_with_fields`]). Labels and
/// transfers are untouched. Returns the new body and the number of
/// statements removed.
pub fn eliminate_dead_code(body: &Body, liveness: &Liveness) -> CfgResult<(Body, usize)> {
    let mut removed = 0;
    let mut blocks = Vec::with_capacity(body.block_count());

    for block in body.blocks() {
        let mut stms = Vec::with_capacity(block.stms.len());
        for (id, stm) in body.block_stms(block) {
            let keep = match stm.dst() {
                _ if stm.has_side_effects() => true,
                Some(dst) => liveness.live_out(id)?.contains(dst),
                None => true,
            };
            if keep {
                stms.push(stm.clone());
            } else {
                removed += 1;
            }
        }
        blocks.push(RawBlock::new(block.label, stms, block.transfer.clone()));
    }

    Ok((Body::from_blocks(blocks)?, removed))
}

/// Dead-code elimination over every method of a program
pub struct DeadCodeElimination<'a> {
    liveness: &'a PerMethod<Liveness>,
}

impl<'a> DeadCodeElimination<'a> {
    pub fn new(liveness: &'a PerMethod<Liveness>) -> Self {
        DeadCodeElimination { liveness }
    }
}

impl Pass for DeadCodeElimination<'_> {
    fn name(&self) -> &'static str {
        "dead-code"
    }

    fn run(&self, program: &Program) -> CfgResult<PassOutcome> {
        let mut changes = 0;
        let program = program.try_map_bodies(|method, body| -> CfgResult<Body> {
            let (body, removed) = eliminate_dead_code(body, self.liveness.get(method)?)?;
            if removed > 0 {
                debug!("{}: removed {} dead statements", method, removed);
            }
            changes += removed;
            Ok(body)
        })?;
        Ok(PassOutcome { program, changes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CfgError;
    use crate::ir::{BinOp, Label, Method, MethodRef, Operand, Stm, Transfer, Type};

    fn single(stms: Vec<Stm>, transfer: Transfer) -> Body {
        Body::from_blocks(vec![RawBlock::new(Label(0), stms, transfer)]).unwrap()
    }

    #[test]
    fn test_removes_unread_temp() {
        let body = single(
            vec![
                Stm::binop("t1", BinOp::Add, 2, 3),
                Stm::binop("t2", BinOp::Times, Operand::var("t1"), 4),
                Stm::print(Operand::var("t1")),
            ],
            Transfer::Return(Operand::Int(0)),
        );
        let live = Liveness::compute(&body).unwrap();
        let (out, removed) = eliminate_dead_code(&body, &live).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            out.to_raw_blocks()[0].stms,
            vec![Stm::binop("t1", BinOp::Add, 2, 3), Stm::print(Operand::var("t1"))]
        );
    }

    #[test]
    fn test_keeps_calls_with_dead_results() {
        let call = Stm::InvokeVirtual {
            dst: "unused".into(),
            ty: Type::Int,
            receiver: "obj".into(),
            method: "tick".into(),
            args: vec![],
        };
        let body = single(
            vec![Stm::mov("dead", 1), call.clone()],
            Transfer::Return(Operand::Int(0)),
        );
        let live = Liveness::compute(&body).unwrap();
        let (out, removed) = eliminate_dead_code(&body, &live).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(out.to_raw_blocks()[0].stms, vec![call]);
    }

    #[test]
    fn test_returned_value_stays() {
        let body = single(vec![Stm::mov("r", 9)], Transfer::Return(Operand::var("r")));
        let live = Liveness::compute(&body).unwrap();
        let (out, removed) = eliminate_dead_code(&body, &live).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(out, body);
    }

    #[test]
    fn test_field_store_survives() {
        // count = v; scratch = v; return 0
        let body = single(
            vec![Stm::mov("count", Operand::var("v")), Stm::mov("scratch", Operand::var("v"))],
            Transfer::Return(Operand::Int(0)),
        );
        let fields = ["count".to_string()].into_iter().collect();
        let live = Liveness::compute_with_fields(&body, fields).unwrap();
        let (out, removed) = eliminate_dead_code(&body, &live).unwrap();

        assert_eq!(removed, 1);
        assert_eq!(out.to_raw_blocks()[0].stms, vec![Stm::mov("count", Operand::var("v"))]);
    }

    #[test]
    fn test_facts_for_a_missing_method_are_an_error() {
        let body = single(vec![], Transfer::Return(Operand::Int(0)));
        let mut program = Program::from_main(body.clone());
        let liveness = program.analyze(|_, body| Liveness::compute(body)).unwrap();
        program.methods.push(Method {
            class_id: "A".into(),
            name: "f".into(),
            ret_ty: Type::Int,
            formals: vec![],
            locals: vec![],
            body,
        });

        let err = DeadCodeElimination::new(&liveness).run(&program).unwrap_err();
        assert_eq!(err, CfgError::MissingMethod(MethodRef::Method(0)));
    }

    #[test]
    fn test_stale_liveness_is_rejected() {
        let empty = single(vec![], Transfer::Return(Operand::Int(0)));
        let live = Liveness::compute(&empty).unwrap();
        let body = single(vec![Stm::mov("x", 1)], Transfer::Return(Operand::Int(0)));
        assert!(eliminate_dead_code(&body, &live).is_err());
    }
}
