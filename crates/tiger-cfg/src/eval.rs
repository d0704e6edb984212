//! Reference interpreter for CFG programs
//!
//! Executes `main`, dispatching virtual calls through the vtables, and
//! collects every printed line. Used to check that optimizations leave a
//! program's observable output unchanged.
//!
//! Variables that are neither declared locals/formals nor already assigned
//! in the frame resolve to fields of `this` when its class declares them.
//! `this` itself names the receiver. Every declared field gets a slot when
//! the object is created: `int` fields start at 0, array and object fields
//! start uninitialized and must be assigned before they are read.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::error::CfgError;
use crate::graph::FlowGraph;
use crate::ir::{Dec, MethodRef, Operand, PerMethod, Program, Stm, Transfer, Type};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("read of unassigned variable `{0}`")]
    Unbound(String),

    #[error("read of uninitialized field `{0}`")]
    Uninitialized(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },

    #[error("array index {index} out of range for length {len}")]
    IndexOutOfRange { index: i32, len: usize },

    #[error("negative array length {0}")]
    NegativeLength(i32),

    #[error("class {class_id} has no method `{method}`")]
    UnknownMethod { class_id: String, method: String },

    #[error("{method} takes {expected} arguments but {found} were supplied")]
    Arity { method: String, expected: usize, found: usize },

    #[error("step budget exhausted")]
    OutOfFuel,

    #[error("call depth limit of {0} exceeded")]
    StackOverflow(usize),

    #[error(transparent)]
    Cfg(#[from] CfgError),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Runtime values
#[derive(Debug, Clone)]
pub enum Value {
    Int(i32),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<i32>>>),
    Object(Rc<Object>),
    /// A reference-typed field that was never assigned
    Null,
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Array(_) => "int[]",
            Value::Object(_) => "object",
        }
    }

    fn as_int(&self) -> EvalResult<i32> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(EvalError::TypeMismatch { expected: "int", found: other.kind() }),
        }
    }

    fn as_array(&self) -> EvalResult<Rc<RefCell<Vec<i32>>>> {
        match self {
            Value::Array(array) => Ok(Rc::clone(array)),
            other => Err(EvalError::TypeMismatch { expected: "int[]", found: other.kind() }),
        }
    }

    fn as_object(&self) -> EvalResult<Rc<Object>> {
        match self {
            Value::Object(object) => Ok(Rc::clone(object)),
            other => Err(EvalError::TypeMismatch { expected: "object", found: other.kind() }),
        }
    }
}

/// A heap object: dynamic class plus field slots
#[derive(Debug)]
pub struct Object {
    pub class_id: String,
    fields: RefCell<FxHashMap<String, Value>>,
}

impl Object {
    fn has_field(&self, name: &str) -> bool {
        self.fields.borrow().contains_key(name)
    }
}

struct Frame {
    this: Option<Rc<Object>>,
    declared: FxHashSet<String>,
    vars: FxHashMap<String, Value>,
}

impl Frame {
    fn new<'d>(this: Option<Rc<Object>>, decls: impl IntoIterator<Item = &'d Dec>) -> Self {
        Frame {
            this,
            declared: decls.into_iter().map(|d| d.id.clone()).collect(),
            vars: FxHashMap::default(),
        }
    }

    fn field_owner(&self, name: &str) -> Option<&Rc<Object>> {
        if self.declared.contains(name) || self.vars.contains_key(name) {
            return None;
        }
        self.this.as_ref().filter(|this| this.has_field(name))
    }

    fn read(&self, name: &str) -> EvalResult<Value> {
        if name == "this" {
            if let Some(this) = &self.this {
                return Ok(Value::Object(Rc::clone(this)));
            }
        }
        if let Some(object) = self.field_owner(name) {
            return match object.fields.borrow().get(name) {
                Some(Value::Null) => Err(EvalError::Uninitialized(name.to_string())),
                Some(value) => Ok(value.clone()),
                None => Err(EvalError::Unbound(name.to_string())),
            };
        }
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::Unbound(name.to_string()))
    }

    fn write(&mut self, name: &str, value: Value) {
        match self.field_owner(name).cloned() {
            Some(object) => {
                object.fields.borrow_mut().insert(name.to_string(), value);
            }
            None => {
                self.vars.insert(name.to_string(), value);
            }
        }
    }

    fn operand(&self, op: &Operand) -> EvalResult<Value> {
        match op {
            Operand::Int(n) => Ok(Value::Int(*n)),
            Operand::Str(s) => Ok(Value::Str(Rc::from(s.as_str()))),
            Operand::Var(name) => self.read(name),
        }
    }
}

pub struct Interpreter<'p> {
    program: &'p Program,
    graphs: Rc<PerMethod<FlowGraph>>,
    output: Vec<String>,
    fuel: u64,
    depth: usize,
    max_depth: usize,
}

impl<'p> Interpreter<'p> {
    pub const DEFAULT_FUEL: u64 = 1_000_000;
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn new(program: &'p Program) -> EvalResult<Self> {
        let graphs = program.analyze(|_, body| FlowGraph::new(body))?;
        Ok(Interpreter {
            program,
            graphs: Rc::new(graphs),
            output: Vec::new(),
            fuel: Self::DEFAULT_FUEL,
            depth: 0,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        })
    }

    /// Cap on executed statements and transfers
    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Run `main` and return the printed lines
    pub fn run(mut self) -> EvalResult<Vec<String>> {
        let frame = Frame::new(None, &self.program.main.locals);
        self.exec(MethodRef::Main, frame)?;
        Ok(self.output)
    }

    fn tick(&mut self) -> EvalResult<()> {
        if self.fuel == 0 {
            return Err(EvalError::OutOfFuel);
        }
        self.fuel -= 1;
        Ok(())
    }

    fn exec(&mut self, method: MethodRef, mut frame: Frame) -> EvalResult<Value> {
        let program = self.program;
        let graphs = Rc::clone(&self.graphs);
        let graph = graphs.get(method)?;
        let body = program.body(method)?;

        let mut current = graph.entry();
        loop {
            let block = body.block(current);
            for (_, stm) in body.block_stms(block) {
                self.tick()?;
                self.step(stm, &mut frame)?;
            }

            self.tick()?;
            let target = match &block.transfer {
                Transfer::Return(value) => return frame.operand(value),
                Transfer::Goto(target) => *target,
                Transfer::If { cond, then_label, else_label } => {
                    if frame.operand(cond)?.as_int()? != 0 {
                        *then_label
                    } else {
                        *else_label
                    }
                }
            };
            current = graph
                .block_index(target)
                .ok_or(CfgError::UnresolvedLabel { from: block.label, target })?;
        }
    }

    fn step(&mut self, stm: &Stm, frame: &mut Frame) -> EvalResult<()> {
        match stm {
            Stm::BinOp { dst, op, left, right, .. } => {
                let l = frame.operand(left)?.as_int()?;
                let r = frame.operand(right)?.as_int()?;
                frame.write(dst, Value::Int(op.eval(l, r)));
            }
            Stm::ArraySelect { dst, array, index, .. } => {
                let array = frame.operand(array)?.as_array()?;
                let index = frame.operand(index)?.as_int()?;
                let value = load(&array.borrow(), index)?;
                frame.write(dst, Value::Int(value));
            }
            Stm::Length { dst, array, .. } => {
                let len = frame.operand(array)?.as_array()?.borrow().len();
                frame.write(dst, Value::Int(len as i32));
            }
            Stm::Move { dst, src, .. } => {
                let value = frame.operand(src)?;
                frame.write(dst, value);
            }
            Stm::NewObject { dst, class_id } => {
                let object = self.instantiate(class_id);
                frame.write(dst, Value::Object(Rc::new(object)));
            }
            Stm::NewIntArray { dst, length } => {
                let len = frame.operand(length)?.as_int()?;
                if len < 0 {
                    return Err(EvalError::NegativeLength(len));
                }
                frame.write(dst, Value::Array(Rc::new(RefCell::new(vec![0; len as usize]))));
            }
            Stm::InvokeVirtual { dst, receiver, method, args, .. } => {
                let object = frame.read(receiver)?.as_object()?;
                let args = args
                    .iter()
                    .map(|arg| frame.operand(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                let result = self.call(object, method, args)?;
                frame.write(dst, result);
            }
            Stm::AssignArray { array, index, value, .. } => {
                let array = frame.read(array)?.as_array()?;
                let index = frame.operand(index)?.as_int()?;
                let value = frame.operand(value)?.as_int()?;
                let mut slots = array.borrow_mut();
                let len = slots.len();
                let slot = usize::try_from(index)
                    .ok()
                    .and_then(|i| slots.get_mut(i))
                    .ok_or(EvalError::IndexOutOfRange { index, len })?;
                *slot = value;
            }
            Stm::Print { arg } => {
                let line = match frame.operand(arg)? {
                    Value::Int(n) => n.to_string(),
                    Value::Str(s) => s.to_string(),
                    other => {
                        return Err(EvalError::TypeMismatch {
                            expected: "int or string",
                            found: other.kind(),
                        })
                    }
                };
                self.output.push(line);
            }
        }
        Ok(())
    }

    fn call(&mut self, object: Rc<Object>, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let program = self.program;
        let target = program
            .resolve_virtual(&object.class_id, name)
            .ok_or_else(|| EvalError::UnknownMethod {
                class_id: object.class_id.clone(),
                method: name.to_string(),
            })?;
        let method = program.method(target).ok_or_else(|| EvalError::UnknownMethod {
            class_id: object.class_id.clone(),
            method: name.to_string(),
        })?;
        if method.formals.len() != args.len() {
            return Err(EvalError::Arity {
                method: method.qualified_name(),
                expected: method.formals.len(),
                found: args.len(),
            });
        }
        if self.depth >= self.max_depth {
            return Err(EvalError::StackOverflow(self.max_depth));
        }

        let mut frame = Frame::new(Some(object), method.formals.iter().chain(&method.locals));
        for (formal, value) in method.formals.iter().zip(args) {
            frame.vars.insert(formal.id.clone(), value);
        }

        self.depth += 1;
        let result = self.exec(target, frame);
        self.depth -= 1;
        result
    }

    fn instantiate(&self, class_id: &str) -> Object {
        let fields: FxHashMap<String, Value> = self
            .program
            .class(class_id)
            .map(|class| {
                class
                    .fields
                    .iter()
                    .map(|field| {
                        let initial = match field.ty {
                            Type::Int => Value::Int(0),
                            _ => Value::Null,
                        };
                        (field.id.clone(), initial)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Object { class_id: class_id.to_string(), fields: RefCell::new(fields) }
    }
}

fn load(slots: &[i32], index: i32) -> EvalResult<i32> {
    usize::try_from(index)
        .ok()
        .and_then(|i| slots.get(i).copied())
        .ok_or(EvalError::IndexOutOfRange { index, len: slots.len() })
}

/// Run `program` with the default limits
pub fn run_program(program: &Program) -> EvalResult<Vec<String>> {
    Interpreter::new(program)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinOp, Body, Class, Label, MainMethod, Method, RawBlock};

    fn main_only(raw: Vec<RawBlock>) -> Program {
        Program::from_main(Body::from_blocks(raw).unwrap())
    }

    #[test]
    fn test_prints_arithmetic() {
        let program = main_only(vec![RawBlock::new(
            Label(0),
            vec![
                Stm::binop("t", BinOp::Add, 2, 3),
                Stm::print(Operand::var("t")),
                Stm::print(Operand::str("done")),
            ],
            Transfer::Return(Operand::Int(0)),
        )]);
        assert_eq!(run_program(&program).unwrap(), vec!["5", "done"]);
    }

    #[test]
    fn test_loop_and_arrays() {
        // a = new int[3]; i = 0; while i < 3 { a[i] = i * 2; i = i + 1 }
        // print a[2]; print a.length
        let program = main_only(vec![
            RawBlock::new(
                Label(0),
                vec![
                    Stm::NewIntArray { dst: "a".into(), length: Operand::Int(3) },
                    Stm::mov("i", 0),
                ],
                Transfer::Goto(Label(1)),
            ),
            RawBlock::new(
                Label(1),
                vec![Stm::binop("c", BinOp::Lt, Operand::var("i"), 3)],
                Transfer::branch(Operand::var("c"), Label(2), Label(3)),
            ),
            RawBlock::new(
                Label(2),
                vec![
                    Stm::binop("v", BinOp::Times, Operand::var("i"), 2),
                    Stm::AssignArray {
                        array: "a".into(),
                        ty: Type::Int,
                        index: Operand::var("i"),
                        value: Operand::var("v"),
                    },
                    Stm::binop("i", BinOp::Add, Operand::var("i"), 1),
                ],
                Transfer::Goto(Label(1)),
            ),
            RawBlock::new(
                Label(3),
                vec![
                    Stm::ArraySelect {
                        dst: "x".into(),
                        ty: Type::Int,
                        array: Operand::var("a"),
                        index: Operand::Int(2),
                    },
                    Stm::print(Operand::var("x")),
                    Stm::Length { dst: "n".into(), ty: Type::Int, array: Operand::var("a") },
                    Stm::print(Operand::var("n")),
                ],
                Transfer::Return(Operand::Int(0)),
            ),
        ]);
        assert_eq!(run_program(&program).unwrap(), vec!["4", "3"]);
    }

    #[test]
    fn test_virtual_call_with_field() {
        // class Counter { int count; int bump(int by) { count = count + by; return count } }
        let bump = Body::from_blocks(vec![RawBlock::new(
            Label(0),
            vec![Stm::binop("count", BinOp::Add, Operand::var("count"), Operand::var("by"))],
            Transfer::Return(Operand::var("count")),
        )])
        .unwrap();
        let main = Body::from_blocks(vec![RawBlock::new(
            Label(0),
            vec![
                Stm::NewObject { dst: "c".into(), class_id: "Counter".into() },
                Stm::InvokeVirtual {
                    dst: "r".into(),
                    ty: Type::Int,
                    receiver: "c".into(),
                    method: "bump".into(),
                    args: vec![Operand::Int(2)],
                },
                Stm::InvokeVirtual {
                    dst: "r".into(),
                    ty: Type::Int,
                    receiver: "c".into(),
                    method: "bump".into(),
                    args: vec![Operand::Int(5)],
                },
                Stm::print(Operand::var("r")),
            ],
            Transfer::Return(Operand::Int(0)),
        )])
        .unwrap();
        let program = Program {
            classes: vec![Class {
                id: "Counter".into(),
                fields: vec![Dec::new(Type::Int, "count")],
            }],
            vtables: vec![],
            methods: vec![Method {
                class_id: "Counter".into(),
                name: "bump".into(),
                ret_ty: Type::Int,
                formals: vec![Dec::new(Type::Int, "by")],
                locals: vec![],
                body: bump,
            }],
            main: MainMethod { locals: vec![], body: main },
        };
        assert_eq!(run_program(&program).unwrap(), vec!["7"]);
    }

    #[test]
    fn test_infinite_loop_runs_out_of_fuel() {
        let program = main_only(vec![RawBlock::new(Label(0), vec![], Transfer::Goto(Label(0)))]);
        let err = Interpreter::new(&program).unwrap().with_fuel(100).run().unwrap_err();
        assert_eq!(err, EvalError::OutOfFuel);
    }

    #[test]
    fn test_unbound_read() {
        let program = main_only(vec![RawBlock::new(
            Label(0),
            vec![Stm::print(Operand::var("ghost"))],
            Transfer::Return(Operand::Int(0)),
        )]);
        assert_eq!(run_program(&program).unwrap_err(), EvalError::Unbound("ghost".into()));
    }

    #[test]
    fn test_index_out_of_range() {
        let program = main_only(vec![RawBlock::new(
            Label(0),
            vec![
                Stm::NewIntArray { dst: "a".into(), length: Operand::Int(1) },
                Stm::ArraySelect {
                    dst: "x".into(),
                    ty: Type::Int,
                    array: Operand::var("a"),
                    index: Operand::Int(1),
                },
            ],
            Transfer::Return(Operand::Int(0)),
        )]);
        assert_eq!(
            run_program(&program).unwrap_err(),
            EvalError::IndexOutOfRange { index: 1, len: 1 }
        );
    }

    fn method(class_id: &str, name: &str, locals: Vec<Dec>, raw: Vec<RawBlock>) -> Method {
        Method {
            class_id: class_id.into(),
            name: name.into(),
            ret_ty: Type::Int,
            formals: vec![],
            locals,
            body: Body::from_blocks(raw).unwrap(),
        }
    }

    fn invoke(dst: &str, receiver: &str, name: &str) -> Stm {
        Stm::InvokeVirtual {
            dst: dst.into(),
            ty: Type::Int,
            receiver: receiver.into(),
            method: name.into(),
            args: vec![],
        }
    }

    fn holder(main: Vec<Stm>) -> Program {
        // class Holder { int[] arr; int init() { arr = new int[2] } int len() { n = arr.length } }
        let init = method(
            "Holder",
            "init",
            vec![],
            vec![RawBlock::new(
                Label(0),
                vec![Stm::NewIntArray { dst: "arr".into(), length: Operand::Int(2) }],
                Transfer::Return(Operand::Int(0)),
            )],
        );
        let len = method(
            "Holder",
            "len",
            vec![Dec::new(Type::Int, "n")],
            vec![RawBlock::new(
                Label(0),
                vec![Stm::Length { dst: "n".into(), ty: Type::Int, array: Operand::var("arr") }],
                Transfer::Return(Operand::var("n")),
            )],
        );
        Program {
            classes: vec![Class {
                id: "Holder".into(),
                fields: vec![Dec::new(Type::IntArray, "arr")],
            }],
            vtables: vec![],
            methods: vec![init, len],
            main: MainMethod {
                locals: vec![],
                body: Body::from_blocks(vec![RawBlock::new(
                    Label(0),
                    main,
                    Transfer::Return(Operand::Int(0)),
                )])
                .unwrap(),
            },
        }
    }

    #[test]
    fn test_array_field_outlives_the_call() {
        let program = holder(vec![
            Stm::NewObject { dst: "h".into(), class_id: "Holder".into() },
            invoke("r", "h", "init"),
            invoke("n", "h", "len"),
            Stm::print(Operand::var("n")),
        ]);
        assert_eq!(run_program(&program).unwrap(), vec!["2"]);
    }

    #[test]
    fn test_unassigned_array_field_read_fails() {
        let program = holder(vec![
            Stm::NewObject { dst: "h".into(), class_id: "Holder".into() },
            invoke("n", "h", "len"),
        ]);
        assert_eq!(run_program(&program).unwrap_err(), EvalError::Uninitialized("arr".into()));
    }
}
