//! Operator definitions for expressions.

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,

    // Logical
    And,
    Or,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
    Mod,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Gt
                | BinaryOperator::Ge
                | BinaryOperator::Lt
                | BinaryOperator::Le
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    /// Comparison and logical operators, evaluated pairwise over the chain
    pub fn is_boolean(&self) -> bool {
        self.is_comparison() || self.is_logical()
    }

    /// Arithmetic operators, left-folded over the operands
    pub fn is_arithmetic(&self) -> bool {
        !self.is_boolean()
    }

    /// Operators whose adjacent same-typed literal operands are pre-reduced
    /// when the expression is built
    pub fn is_foldable(&self) -> bool {
        matches!(self, BinaryOperator::Add | BinaryOperator::Mul)
    }

    /// Whether a nested operand of the same kind may be absorbed at any
    /// position. Left-folded operators that are not associative only absorb
    /// a nested chain in first position, where the fold order is unchanged.
    pub fn is_associative(&self) -> bool {
        self.is_boolean() || matches!(self, BinaryOperator::Add | BinaryOperator::Mul)
    }

    /// Logical complement of a comparison
    pub fn inverse(&self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::Eq => Some(BinaryOperator::Ne),
            BinaryOperator::Ne => Some(BinaryOperator::Eq),
            BinaryOperator::Gt => Some(BinaryOperator::Le),
            BinaryOperator::Le => Some(BinaryOperator::Gt),
            BinaryOperator::Ge => Some(BinaryOperator::Lt),
            BinaryOperator::Lt => Some(BinaryOperator::Ge),
            _ => None,
        }
    }

    /// Get the display string for this operator
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Pow => "**",
            BinaryOperator::Mod => "%",
        }
    }
}

/// Unary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Logical complement
    Not,
    /// Arithmetic negation; also marks a descending sort key
    Negate,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "~",
            UnaryOperator::Negate => "-",
        }
    }
}
