use rand::Rng;
use std::collections::HashMap;
use std::fmt;

use crate::error::{PicEvolveError, Result};

/// Every image primitive a genome can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rnd,
    Minimum,
    Maximum,
    Absolute,
    Expt,
    Logarithm,
    Sine,
    Cosine,
    Tangent,
    Asine,
    Acosine,
    Atangent,
    And,
    Or,
    Xor,
    Noise,
    Blur,
    EdgeEnhance,
    Emboss,
    Mandel,
    Lerp,
}

impl Function {
    pub const ALL: [Function; 26] = [
        Function::Add,
        Function::Sub,
        Function::Mul,
        Function::Div,
        Function::Mod,
        Function::Rnd,
        Function::Minimum,
        Function::Maximum,
        Function::Absolute,
        Function::Expt,
        Function::Logarithm,
        Function::Sine,
        Function::Cosine,
        Function::Tangent,
        Function::Asine,
        Function::Acosine,
        Function::Atangent,
        Function::And,
        Function::Or,
        Function::Xor,
        Function::Noise,
        Function::Blur,
        Function::EdgeEnhance,
        Function::Emboss,
        Function::Mandel,
        Function::Lerp,
    ];

    /// Name used in genome text
    pub fn name(&self) -> &'static str {
        match self {
            Function::Add => "add",
            Function::Sub => "sub",
            Function::Mul => "mul",
            Function::Div => "div",
            Function::Mod => "mod",
            Function::Rnd => "rnd",
            Function::Minimum => "minimum",
            Function::Maximum => "maximum",
            Function::Absolute => "absolute",
            Function::Expt => "expt",
            Function::Logarithm => "logarithm",
            Function::Sine => "sine",
            Function::Cosine => "cosine",
            Function::Tangent => "tangent",
            Function::Asine => "asine",
            Function::Acosine => "acosine",
            Function::Atangent => "atangent",
            Function::And => "And",
            Function::Or => "Or",
            Function::Xor => "Xor",
            Function::Noise => "noise",
            Function::Blur => "blur",
            Function::EdgeEnhance => "edgeEnhance",
            Function::Emboss => "emboss",
            Function::Mandel => "mandel",
            Function::Lerp => "lerp",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Absolute
            | Function::Sine
            | Function::Cosine
            | Function::Tangent
            | Function::Asine
            | Function::Acosine
            | Function::Atangent => 1,
            Function::Lerp => 3,
            _ => 2,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only mapping from genome names to the enabled primitives
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Function>,
    // Stable order for uniform random choice
    ordered: Vec<Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::with_functions(&Function::ALL)
    }

    pub fn with_functions(functions: &[Function]) -> Self {
        let mut ordered: Vec<Function> = Vec::with_capacity(functions.len());
        for function in functions {
            if !ordered.contains(function) {
                ordered.push(*function);
            }
        }
        let functions = ordered.iter().map(|f| (f.name(), *f)).collect();
        Self { functions, ordered }
    }

    /// Registry with every primitive except the named ones
    pub fn excluding(names: &[String]) -> Result<Self> {
        for name in names {
            if Function::from_name(name).is_none() {
                return Err(PicEvolveError::UnknownFunction(name.clone()));
            }
        }
        let enabled: Vec<Function> = Function::ALL
            .iter()
            .copied()
            .filter(|f| !names.iter().any(|n| n == f.name()))
            .collect();
        if enabled.is_empty() {
            return Err(PicEvolveError::Configuration(
                "At least one function must remain enabled".to_string(),
            ));
        }
        Ok(Self::with_functions(&enabled))
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.get(name).map(|f| f.arity())
    }

    pub fn contains(&self, function: Function) -> bool {
        self.functions.contains_key(function.name())
    }

    pub fn functions(&self) -> &[Function] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn random_function<R: Rng + ?Sized>(&self, rng: &mut R) -> Function {
        self.ordered[rng.gen_range(0..self.ordered.len())]
    }

    /// Uniformly pick an enabled function other than `current`.
    /// Falls back to `current` when it is the only one enabled.
    pub fn random_function_except<R: Rng + ?Sized>(
        &self,
        current: Function,
        rng: &mut R,
    ) -> Function {
        let others: Vec<Function> = self
            .ordered
            .iter()
            .copied()
            .filter(|f| *f != current)
            .collect();
        if others.is_empty() {
            return current;
        }
        others[rng.gen_range(0..others.len())]
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
