use crate::symbolic::{Expr, ExprKind, SymbolicError};
use crate::traits::{constant, Scalar, ScalarField};
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

/// OpCodes for the stack-based virtual machine.
/// The VM operates on a stack of `Scalar` values (f64 or Dual).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    LoadVar(usize),
    /// Pushes the value of a parameter (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes a^n for an integer n.
    PowI(i32),
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    /// Pops top value (a), pushes -a.
    Neg,
    /// Pops top value (a), pushes 1/a.
    Recip,
}

/// A compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack-based virtual machine for evaluating compiled expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Variable values (read-only).
/// - `params`: Parameter values (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
pub struct VM;

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

impl VM {
    /// Executes the bytecode and returns the value left on the stack.
    /// Out-of-range indices and stack underflow evaluate to NaN.
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match *op {
                OpCode::LoadConst(val) => stack.push(constant(val)),
                OpCode::LoadVar(idx) => stack.push(vars.get(idx).copied().unwrap_or_else(T::nan)),
                OpCode::LoadParam(idx) => {
                    stack.push(params.get(idx).copied().unwrap_or_else(T::nan))
                }
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    stack.push(match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    });
                }
                OpCode::PowI(n) => {
                    let a = pop(stack);
                    stack.push(a.powi(n));
                }
                OpCode::Sqrt => {
                    let a = pop(stack);
                    stack.push(a.sqrt());
                }
                OpCode::Abs => {
                    let a = pop(stack);
                    stack.push(a.abs());
                }
                OpCode::Sin => {
                    let a = pop(stack);
                    stack.push(a.sin());
                }
                OpCode::Cos => {
                    let a = pop(stack);
                    stack.push(a.cos());
                }
                OpCode::Tan => {
                    let a = pop(stack);
                    stack.push(a.tan());
                }
                OpCode::Exp => {
                    let a = pop(stack);
                    stack.push(a.exp());
                }
                OpCode::Ln => {
                    let a = pop(stack);
                    stack.push(a.ln());
                }
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
                OpCode::Recip => {
                    let a = pop(stack);
                    stack.push(a.recip());
                }
            }
        }

        pop(stack)
    }
}

/// Lowers a symbolic expression into `Bytecode`.
/// Resolves variable and parameter names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new<S: AsRef<str>>(var_names: &[S], param_names: &[S]) -> Self {
        let index = |names: &[S]| {
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_ref().to_string(), i))
                .collect::<HashMap<_, _>>()
        };
        Self {
            var_map: index(var_names),
            param_map: index(param_names),
        }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, SymbolicError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), SymbolicError> {
        match &expr.kind {
            ExprKind::Number(n) => ops.push(OpCode::LoadConst(*n)),
            ExprKind::Symbol(symbol) => {
                let name = symbol.name().unwrap_or_default();
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else if name == "pi" {
                    ops.push(OpCode::LoadConst(std::f64::consts::PI));
                } else {
                    return Err(SymbolicError::UnknownSymbol(name.to_string()));
                }
            }
            ExprKind::Add(a, b) => self.compile_binary(a, b, OpCode::Add, ops)?,
            ExprKind::Sub(a, b) => self.compile_binary(a, b, OpCode::Sub, ops)?,
            ExprKind::Mul(a, b) => match (a.as_number(), b.as_number()) {
                (Some(n), _) if n == -1.0 => {
                    self.compile_recursive(b, ops)?;
                    ops.push(OpCode::Neg);
                }
                (_, Some(n)) if n == -1.0 => {
                    self.compile_recursive(a, ops)?;
                    ops.push(OpCode::Neg);
                }
                _ => self.compile_binary(a, b, OpCode::Mul, ops)?,
            },
            ExprKind::Div(a, b) => self.compile_binary(a, b, OpCode::Div, ops)?,
            ExprKind::Pow(base, exp) => {
                self.compile_recursive(base, ops)?;
                match exp.as_number() {
                    Some(e) if e == 0.5 => ops.push(OpCode::Sqrt),
                    Some(e) if e.fract() == 0.0 && e.abs() <= i32::MAX as f64 => {
                        ops.push(OpCode::PowI(e as i32))
                    }
                    _ => {
                        self.compile_recursive(exp, ops)?;
                        ops.push(OpCode::Pow);
                    }
                }
            }
            ExprKind::FunctionCall { name, args } => {
                let lowered: &[OpCode] = match name.as_str() {
                    "sin" => &[OpCode::Sin],
                    "cos" => &[OpCode::Cos],
                    "tan" => &[OpCode::Tan],
                    "cot" => &[OpCode::Tan, OpCode::Recip],
                    "sec" => &[OpCode::Cos, OpCode::Recip],
                    "csc" => &[OpCode::Sin, OpCode::Recip],
                    "exp" => &[OpCode::Exp],
                    "ln" | "log" => &[OpCode::Ln],
                    "sqrt" => &[OpCode::Sqrt],
                    "abs" => &[OpCode::Abs],
                    _ => return Err(SymbolicError::UndefinedFunction(name.clone())),
                };
                match args.as_slice() {
                    [arg] => self.compile_recursive(arg, ops)?,
                    _ => return Err(SymbolicError::UndefinedFunction(name.clone())),
                }
                ops.extend_from_slice(lowered);
            }
            ExprKind::Derivative { inner, .. } => {
                return Err(SymbolicError::UnevaluatedDerivative(inner.to_string()));
            }
        }
        Ok(())
    }

    fn compile_binary(
        &self,
        a: &Expr,
        b: &Expr,
        op: OpCode,
        ops: &mut Vec<OpCode>,
    ) -> Result<(), SymbolicError> {
        self.compile_recursive(a, ops)?;
        self.compile_recursive(b, ops)?;
        ops.push(op);
        Ok(())
    }
}

/// A compiled scalar field over `T`, evaluated by the VM.
pub struct CompiledField<T: Scalar> {
    pub bytecode: Bytecode,
    pub dimension: usize,
    pub params: Vec<T>,
    // Interior mutability for the VM stack to avoid allocation per evaluation.
    stack: RefCell<Vec<T>>,
}

impl<T: Scalar> CompiledField<T> {
    /// Compiles `expr` as a field of `vars` with no parameters.
    pub fn new<S: AsRef<str>>(expr: &Expr, vars: &[S]) -> Result<Self, SymbolicError> {
        let bytecode = Compiler::new(vars, &[]).compile(expr)?;
        Ok(Self::from_bytecode(bytecode, vars.len(), Vec::new()))
    }

    pub fn from_bytecode(bytecode: Bytecode, dimension: usize, params: Vec<T>) -> Self {
        Self {
            bytecode,
            dimension,
            params,
            stack: RefCell::new(Vec::with_capacity(64)),
        }
    }
}

impl<T: Scalar> ScalarField<T> for CompiledField<T> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn value(&self, point: &[T]) -> T {
        let mut stack = self.stack.borrow_mut();
        VM::execute(&self.bytecode, point, &self.params, &mut stack)
    }
}

/// Evaluates `expr` with every free symbol bound in `bindings`.
pub fn evaluate(expr: &Expr, bindings: &[(&str, f64)]) -> Result<f64> {
    let names: Vec<&str> = bindings.iter().map(|(name, _)| *name).collect();
    let values: Vec<f64> = bindings.iter().map(|(_, value)| *value).collect();
    let bytecode = Compiler::new(names.as_slice(), &[]).compile(expr)?;
    let mut stack = Vec::with_capacity(32);
    Ok(VM::execute(&bytecode, &values, &[], &mut stack))
}
