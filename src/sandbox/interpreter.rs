//! Tree-walking evaluator for the parsed build-script AST, enforcing the
//! runtime resource quotas from spec §4.3.

use super::parser::{BinOp, Expr, Stmt, UnOp};
use super::{MAX_EMITTED_COMMANDS, MAX_LOOP_ITERATIONS, MAX_WALL_CLOCK};
use crate::error::VibeCraftError;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Clone)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    None,
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::List(l) => !l.is_empty(),
            Value::None => false,
        }
    }

    fn display(&self) -> String {
        match self {
            Value::Num(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Str(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.display()).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::None => "None".to_string(),
        }
    }

    fn as_num(&self) -> Result<f64, String> {
        match self {
            Value::Num(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(format!("expected a number, found {:?}", other)),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

struct ExecState {
    vars: HashMap<String, Value>,
    iterations: u64,
    started_at: Instant,
}

impl ExecState {
    fn check_budget(&self) -> Result<(), String> {
        if self.started_at.elapsed() > MAX_WALL_CLOCK {
            return Err("wall-clock execution budget exceeded".to_string());
        }
        Ok(())
    }
}

pub fn run(program: &[Stmt], output_name: &str) -> Result<Vec<String>, VibeCraftError> {
    let mut state = ExecState {
        vars: seed_env(),
        iterations: 0,
        started_at: Instant::now(),
    };

    exec_block(program, &mut state).map_err(VibeCraftError::SandboxViolation)?;

    match state.vars.get(output_name) {
        Some(Value::List(items)) => {
            if items.len() > MAX_EMITTED_COMMANDS {
                return Err(VibeCraftError::SandboxViolation(format!(
                    "emitted command list exceeds {MAX_EMITTED_COMMANDS} entries"
                )));
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => out.push(s.clone()),
                    other => {
                        return Err(VibeCraftError::SandboxViolation(format!(
                            "output list must contain only strings, found {:?}",
                            other
                        )))
                    }
                }
            }
            Ok(out)
        }
        Some(_) => Err(VibeCraftError::SandboxViolation(format!(
            "'{output_name}' is not a list of strings"
        ))),
        None => Err(VibeCraftError::SandboxViolation(format!(
            "script did not produce a variable named '{output_name}'"
        ))),
    }
}

fn seed_env() -> HashMap<String, Value> {
    let mut vars = HashMap::new();
    vars.insert("pi".to_string(), Value::Num(std::f64::consts::PI));
    vars.insert("e".to_string(), Value::Num(std::f64::consts::E));
    vars
}

fn exec_block(stmts: &[Stmt], state: &mut ExecState) -> Result<(), String> {
    for stmt in stmts {
        exec_stmt(stmt, state)?;
    }
    Ok(())
}

fn exec_stmt(stmt: &Stmt, state: &mut ExecState) -> Result<(), String> {
    state.check_budget()?;
    match stmt {
        Stmt::Assign(name, expr) => {
            let value = eval(expr, state)?;
            state.vars.insert(name.clone(), value);
            Ok(())
        }
        Stmt::ExprStmt(expr) => {
            eval(expr, state)?;
            Ok(())
        }
        Stmt::For { var, iter, body } => {
            let iterable = eval(iter, state)?;
            let items = match iterable {
                Value::List(items) => items,
                other => return Err(format!("cannot iterate over {:?}", other)),
            };
            for item in items {
                state.iterations += 1;
                if state.iterations > MAX_LOOP_ITERATIONS {
                    return Err(format!("loop iteration budget of {MAX_LOOP_ITERATIONS} exceeded"));
                }
                state.check_budget()?;
                state.vars.insert(var.clone(), item);
                exec_block(body, state)?;
            }
            Ok(())
        }
        Stmt::If { branches, else_body } => {
            for (cond, body) in branches {
                if eval(cond, state)?.truthy() {
                    return exec_block(body, state);
                }
            }
            if let Some(body) = else_body {
                exec_block(body, state)?;
            }
            Ok(())
        }
    }
}

fn eval(expr: &Expr, state: &mut ExecState) -> Result<Value, String> {
    match expr {
        Expr::Num(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::None => Ok(Value::None),
        Expr::Ident(name) => state
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| format!("undefined name '{name}'")),
        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, state)?);
            }
            Ok(Value::List(out))
        }
        Expr::Unary(op, inner) => {
            let v = eval(inner, state)?;
            match op {
                UnOp::Neg => Ok(Value::Num(-v.as_num()?)),
                UnOp::Not => Ok(Value::Bool(!v.truthy())),
            }
        }
        Expr::Binary(lhs, op, rhs) => eval_binary(lhs, *op, rhs, state),
        Expr::Index(target, index) => {
            let t = eval(target, state)?;
            let i = eval(index, state)?.as_num()? as i64;
            match t {
                Value::List(items) => {
                    let idx = if i < 0 { items.len() as i64 + i } else { i };
                    items
                        .get(idx as usize)
                        .cloned()
                        .ok_or_else(|| format!("index {i} out of bounds"))
                }
                Value::Str(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let idx = if i < 0 { chars.len() as i64 + i } else { i };
                    chars
                        .get(idx as usize)
                        .map(|c| Value::Str(c.to_string()))
                        .ok_or_else(|| format!("index {i} out of bounds"))
                }
                other => Err(format!("cannot index into {:?}", other)),
            }
        }
        Expr::Call(callee, args) => {
            let name = match callee.as_ref() {
                Expr::Ident(n) => n.clone(),
                _ => return Err("only named functions may be called".to_string()),
            };
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(eval(a, state)?);
            }
            call_builtin(&name, values)
        }
        Expr::MethodCall(target, method, args) => eval_method_call(target, method, args, state),
    }
}

fn eval_binary(lhs: &Expr, op: BinOp, rhs: &Expr, state: &mut ExecState) -> Result<Value, String> {
    if matches!(op, BinOp::And) {
        let l = eval(lhs, state)?;
        if !l.truthy() {
            return Ok(l);
        }
        return eval(rhs, state);
    }
    if matches!(op, BinOp::Or) {
        let l = eval(lhs, state)?;
        if l.truthy() {
            return Ok(l);
        }
        return eval(rhs, state);
    }

    let l = eval(lhs, state)?;
    let r = eval(rhs, state)?;

    match op {
        BinOp::Add => match (&l, &r) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{}{}", l.display(), r.display()))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.clone());
                Ok(Value::List(out))
            }
            _ => Ok(Value::Num(l.as_num()? + r.as_num()?)),
        },
        BinOp::Sub => Ok(Value::Num(l.as_num()? - r.as_num()?)),
        BinOp::Mul => Ok(Value::Num(l.as_num()? * r.as_num()?)),
        BinOp::Div => {
            let denom = r.as_num()?;
            if denom == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Num(l.as_num()? / denom))
        }
        BinOp::Mod => Ok(Value::Num(l.as_num()? % r.as_num()?)),
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt => compare(&l, &r, |o| o == std::cmp::Ordering::Less),
        BinOp::Le => compare(&l, &r, |o| o != std::cmp::Ordering::Greater),
        BinOp::Gt => compare(&l, &r, |o| o == std::cmp::Ordering::Greater),
        BinOp::Ge => compare(&l, &r, |o| o != std::cmp::Ordering::Less),
        BinOp::And | BinOp::Or => unreachable!(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::None, Value::None) => true,
        _ => false,
    }
}

fn compare(a: &Value, b: &Value, pred: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, String> {
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => a
            .as_num()?
            .partial_cmp(&b.as_num()?)
            .ok_or_else(|| "cannot compare values".to_string())?,
    };
    Ok(Value::Bool(pred(ordering)))
}

fn eval_method_call(target: &Expr, method: &str, args: &[Expr], state: &mut ExecState) -> Result<Value, String> {
    let name = match target {
        Expr::Ident(n) => n.clone(),
        _ => return Err("method calls are only supported on named list variables".to_string()),
    };
    let mut arg_values = Vec::with_capacity(args.len());
    for a in args {
        arg_values.push(eval(a, state)?);
    }

    let current = state
        .vars
        .get(&name)
        .cloned()
        .ok_or_else(|| format!("undefined name '{name}'"))?;
    let mut list = match current {
        Value::List(items) => items,
        other => return Err(format!("'{method}' is not defined for {:?}", other)),
    };

    match method {
        "append" => {
            if arg_values.len() != 1 {
                return Err("append() takes exactly one argument".to_string());
            }
            list.push(arg_values.remove(0));
        }
        "extend" => {
            if arg_values.len() != 1 {
                return Err("extend() takes exactly one argument".to_string());
            }
            match arg_values.remove(0) {
                Value::List(items) => list.extend(items),
                other => return Err(format!("extend() requires a list argument, found {:?}", other)),
            }
        }
        other => return Err(format!("unknown list method '{other}'")),
    }

    if list.len() > MAX_EMITTED_COMMANDS * 4 {
        return Err(format!("list '{name}' grew beyond the permitted bound"));
    }

    state.vars.insert(name, Value::List(list));
    Ok(Value::None)
}

fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value, String> {
    match name {
        "range" => {
            let (start, stop, step) = match args.len() {
                1 => (0.0, args[0].as_num()?, 1.0),
                2 => (args[0].as_num()?, args[1].as_num()?, 1.0),
                3 => (args[0].as_num()?, args[1].as_num()?, args[2].as_num()?),
                n => return Err(format!("range() takes 1 to 3 arguments, got {n}")),
            };
            if step == 0.0 {
                return Err("range() step must not be zero".to_string());
            }
            let mut out = Vec::new();
            let mut cur = start;
            while (step > 0.0 && cur < stop) || (step < 0.0 && cur > stop) {
                out.push(Value::Num(cur));
                cur += step;
                if out.len() > MAX_LOOP_ITERATIONS as usize {
                    return Err("range() would exceed the loop iteration budget".to_string());
                }
            }
            Ok(Value::List(out))
        }
        "len" => match args.as_slice() {
            [Value::List(items)] => Ok(Value::Num(items.len() as f64)),
            [Value::Str(s)] => Ok(Value::Num(s.chars().count() as f64)),
            _ => Err("len() requires a single list or string argument".to_string()),
        },
        "enumerate" => match args.as_slice() {
            [Value::List(items)] => Ok(Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Value::List(vec![Value::Num(i as f64), v.clone()]))
                    .collect(),
            )),
            _ => Err("enumerate() requires a single list argument".to_string()),
        },
        "zip" => match args.as_slice() {
            [Value::List(a), Value::List(b)] => Ok(Value::List(
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| Value::List(vec![x.clone(), y.clone()]))
                    .collect(),
            )),
            _ => Err("zip() requires two list arguments".to_string()),
        },
        "abs" => Ok(Value::Num(args.first().ok_or("abs() requires one argument")?.as_num()?.abs())),
        "min" => reduce_numeric(args, f64::min, "min"),
        "max" => reduce_numeric(args, f64::max, "max"),
        "int" => Ok(Value::Num(args.first().ok_or("int() requires one argument")?.as_num()?.trunc())),
        "float" => Ok(Value::Num(args.first().ok_or("float() requires one argument")?.as_num()?)),
        "str" => Ok(Value::Str(args.first().ok_or("str() requires one argument")?.display())),
        "sin" => unary_math(args, f64::sin),
        "cos" => unary_math(args, f64::cos),
        "tan" => unary_math(args, f64::tan),
        "sqrt" => unary_math(args, f64::sqrt),
        "floor" => unary_math(args, f64::floor),
        "ceil" => unary_math(args, f64::ceil),
        other => Err(format!("'{other}' is not a recognized builtin")),
    }
}

fn unary_math(args: Vec<Value>, f: impl Fn(f64) -> f64) -> Result<Value, String> {
    let v = args.first().ok_or("expected one numeric argument")?.as_num()?;
    Ok(Value::Num(f(v)))
}

fn reduce_numeric(args: Vec<Value>, f: impl Fn(f64, f64) -> f64, name: &str) -> Result<Value, String> {
    let nums: Vec<f64> = if args.len() == 1 {
        match &args[0] {
            Value::List(items) => items.iter().map(|v| v.as_num()).collect::<Result<_, _>>()?,
            other => vec![other.as_num()?],
        }
    } else {
        args.iter().map(|v| v.as_num()).collect::<Result<_, _>>()?
    };
    nums.into_iter()
        .reduce(f)
        .map(Value::Num)
        .ok_or_else(|| format!("{name}() requires at least one value"))
}
