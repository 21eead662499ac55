use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, ExprId, Stmt};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::function::{LoxFunction, NativeFunction};
use crate::token::{Token, TokenType};
use crate::value::{is_equal, is_truthy, Value};

/// Outcome of executing a statement.  `Return` rides the happy path of the
/// `Result` so a `return` statement can unwind through nested blocks without
/// being mistaken for an error; function-call boundaries convert it back
/// into a plain value.
#[derive(Debug)]
pub enum Signal {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,

    /// Lexical depth per use-site node id, filled in by the resolver.
    /// Absent entries resolve at global scope.
    locals: HashMap<ExprId, usize>,

    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter::with_output(Box::new(std::io::stdout()))
    }

    /// Interpreter writing `print` output to the given sink instead of
    /// stdout.  Tests capture program output this way.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            })),
        );

        let environment = Rc::clone(&globals);

        Interpreter {
            globals,
            environment,
            locals: HashMap::new(),
            output,
        }
    }

    /// Resolver callback: the variable at use-site `id` lives `depth` frames
    /// up from wherever the cursor is when that node executes.
    pub fn resolve_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Run a resolved program.  The first runtime error aborts the run and
    /// is returned for the driver to report.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            match self.execute(stmt)? {
                Signal::Normal => {}

                // The resolver rejects top-level `return`; nothing to unwind to.
                Signal::Return(_) => break,
            }
        }

        Ok(())
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Signal::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Signal::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Signal::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Signal::Return(value) = self.execute(body)? {
                        return Ok(Signal::Return(value));
                    }
                }

                Ok(Signal::Normal)
            }

            Stmt::Function(decl) => {
                let function = LoxFunction::new(
                    Rc::clone(decl),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Signal::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = if let Some(expr) = value {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                Ok(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Run `statements` inside `environment`, restoring the previous cursor
    /// on every exit path, error unwinding included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Environment,
    ) -> Result<Signal> {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        self.environment = Rc::new(RefCell::new(environment));

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::Normal) => {}

                Ok(Signal::Return(value)) => {
                    self.environment = previous;
                    return Ok(Signal::Return(value));
                }

                Err(e) => {
                    self.environment = previous;
                    return Err(e);
                }
            }
        }

        self.environment = previous;

        Ok(Signal::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionDecl>],
    ) -> Result<Signal> {
        // The superclass expression can evaluate to anything, so the check
        // that it is actually a class happens here at runtime.
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;

                match value {
                    Value::Class(class) => Some(class),

                    _ => {
                        // The grammar only produces variable superclasses.
                        let Expr::Variable {
                            name: super_name, ..
                        } = expr
                        else {
                            unreachable!("superclass is always a variable reference");
                        };

                        return Err(LoxError::runtime(
                            super_name.line,
                            "Superclass must be a class.",
                        ));
                    }
                }
            }

            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over a frame holding `super`, so a
        // `super.m()` inside them finds the superclass no matter where the
        // method ends up bound.
        let mut popped_environment: Option<Rc<RefCell<Environment>>> = None;

        if let Some(superclass) = &superclass_value {
            let enclosing = Rc::clone(&self.environment);

            let mut environment = Environment::with_enclosing(Rc::clone(&enclosing));
            environment.define("super", Value::Class(Rc::clone(superclass)));

            self.environment = Rc::new(RefCell::new(environment));
            popped_environment = Some(enclosing);
        }

        let mut method_map: HashMap<String, LoxFunction> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";

            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                is_initializer,
            );

            method_map.insert(method.name.lexeme.clone(), function);
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_map);

        if let Some(enclosing) = popped_environment {
            self.environment = enclosing;
        }

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.line,
        )?;

        Ok(Signal::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),

                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),

                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),

                _ => Err(LoxError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;

                    instance.set(name, value.clone());

                    Ok(value)
                }

                _ => Err(LoxError::runtime(name.line, "Only instances have fields.")),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value> {
        let callee_val = self.evaluate(callee)?;

        let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());

        for arg in arguments {
            arg_values.push(self.evaluate(arg)?);
        }

        let arity = match &callee_val {
            Value::NativeFunction(native) => native.arity,
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),

            _ => {
                return Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                ));
            }
        };

        if arg_values.len() != arity {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} arguments but got {}.", arity, arg_values.len()),
            ));
        }

        match callee_val {
            Value::NativeFunction(native) => {
                (native.func)(&arg_values).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function(function) => function.call(self, arg_values),

            Value::Class(class) => LoxClass::call(&class, self, arg_values),

            _ => unreachable!("Non-callable rejected above"),
        }
    }

    /// `super.m`: the superclass sits at the resolved depth, the receiver
    /// one frame below it.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance = *self.locals.get(&id).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let superclass =
            match Environment::get_at(&self.environment, distance, "super", keyword.line)? {
                Value::Class(class) => class,

                _ => {
                    return Err(LoxError::runtime(
                        keyword.line,
                        "Superclass must be a class.",
                    ));
                }
            };

        let receiver_depth = distance.checked_sub(1).ok_or_else(|| {
            LoxError::runtime(keyword.line, "Can't use 'super' outside of a class.")
        })?;

        let receiver =
            match Environment::get_at(&self.environment, receiver_depth, "this", keyword.line)? {
                Value::Instance(instance) => instance,

                _ => {
                    return Err(LoxError::runtime(
                        keyword.line,
                        "Can't use 'super' outside of a class.",
                    ));
                }
            };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(receiver)))),

            None => Err(LoxError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(LoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&value))),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Number(a * b))
            }

            // IEEE-754 division: x/0 is ±Inf or NaN, never an error.
            TokenType::SLASH => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = self.number_operands(operator, left_val, right_val)?;

                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left_val, &right_val))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left_val, &right_val))),

            _ => Err(LoxError::runtime(
                operator.line,
                "Invalid binary operator.",
            )),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),

            _ => Err(LoxError::runtime(
                operator.line,
                "Operands must be numbers.",
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn clock_native(_args: &[Value]) -> std::result::Result<Value, String> {
    // Seconds since the Unix epoch, fractional part included.
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
