//! Output Module
//!
//! Value expressions, the clause library, the code stream and the program
//! representation they produce.

pub mod clauses;
pub mod program;
pub mod stream;
pub mod value_expr;

pub use clauses::{Clause, ClauseEmitter, Tag};
pub use program::{Line, Program, ProgramKind, Stmt, StmtKind, Target};
pub use stream::CodeStream;
pub use value_expr::{Declaration, JoinPart, Symbol, SymbolMapping, Value, ValueExpr};
