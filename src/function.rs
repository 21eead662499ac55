use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Interpreter, Signal};
use crate::value::Value;

/// A user-defined function: its declaration plus the environment that was
/// current at the declaration site.  Bound methods are ordinary
/// `LoxFunction`s whose closure carries an extra `this` frame.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this function whose closure is a fresh frame enclosing the
    /// original, with `this` bound to the receiver.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        environment.define("this", Value::Instance(instance));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// The call protocol: a fresh environment enclosing the closure, one
    /// binding per parameter, then the body as a block.  A `Return` unwind
    /// becomes the call's value; initializers yield the receiver no matter
    /// how the body exits.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let signal = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        match signal {
            Signal::Return(value) => Ok(value),

            Signal::Normal => Ok(Value::Nil),
        }
    }
}

/// A function provided by the host, e.g. `clock`.  Errors are plain strings;
/// the call site attaches the source line.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
