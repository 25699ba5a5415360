use crate::ast::*;
use crate::types::Type;
use crate::visitor::{walk, Visitor, Walk};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Structural counts for one script, gathered in a single walk.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub imports: usize,
    pub variables: usize,
    pub properties: usize,
    pub functions: usize,
    pub events: usize,
    pub states: usize,
    pub statements: StatementCounts,
    pub expressions: usize,
    /// Deepest `If`/`While` nesting inside any function or event body.
    pub max_depth: usize,
    /// Call targets by name, with how often each is called.
    pub calls: BTreeMap<String, usize>,
    #[serde(skip)]
    depth: usize,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct StatementCounts {
    pub expression: usize,
    pub assign: usize,
    pub if_: usize,
    pub while_: usize,
    pub return_: usize,
    pub declare: usize,
}

impl StatementCounts {
    pub fn total(&self) -> usize {
        self.expression + self.assign + self.if_ + self.while_ + self.return_ + self.declare
    }
}

impl ScriptSummary {
    pub fn of(script: &Script) -> Self {
        let mut summary = ScriptSummary {
            name: script.name.name.clone(),
            ..ScriptSummary::default()
        };
        // No hook ever stops the walk.
        let _ = walk(script, &mut summary);
        summary
    }

    fn nest(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }
}

/// The name a call expression targets: `Foo` for `Foo()`, `Debug.Trace` for
/// `Debug.Trace()`, `?.GetName` when the receiver is not a plain name.
fn call_name(callee: &Expression) -> String {
    match callee {
        Expression::Identifier(id) => id.name.clone(),
        Expression::MemberAccess(access) => match access.object.as_ref() {
            Expression::Identifier(object) => format!("{}.{}", object.name, access.member.name),
            _ => format!("?.{}", access.member.name),
        },
        _ => String::from("?"),
    }
}

impl Visitor for ScriptSummary {
    fn enter_script(&mut self, _: &Script) -> Walk {
        Walk::Continue
    }

    fn enter_import(&mut self, _: &Import) -> Walk {
        self.imports += 1;
        Walk::Continue
    }

    fn enter_variable(&mut self, _: &VariableDecl) -> Walk {
        self.variables += 1;
        Walk::Continue
    }

    fn enter_property(&mut self, _: &PropertyDecl) -> Walk {
        self.properties += 1;
        Walk::Continue
    }

    fn enter_function(&mut self, _: &FunctionDecl) -> Walk {
        self.functions += 1;
        Walk::Continue
    }

    fn enter_event(&mut self, _: &EventDecl) -> Walk {
        self.events += 1;
        Walk::Continue
    }

    fn enter_state(&mut self, _: &StateDecl) -> Walk {
        self.states += 1;
        Walk::Continue
    }

    fn enter_parameter(&mut self, _: &Parameter) -> Walk {
        Walk::Continue
    }

    fn enter_expr_stmt(&mut self, _: &ExprStmt) -> Walk {
        self.statements.expression += 1;
        Walk::Continue
    }

    fn enter_assign(&mut self, _: &Assign) -> Walk {
        self.statements.assign += 1;
        Walk::Continue
    }

    fn enter_if(&mut self, _: &If) -> Walk {
        self.statements.if_ += 1;
        self.nest();
        Walk::Continue
    }

    fn exit_if(&mut self, _: &If) {
        self.depth -= 1;
    }

    fn enter_branch(&mut self, _: &Branch) -> Walk {
        Walk::Continue
    }

    fn enter_while(&mut self, _: &While) -> Walk {
        self.statements.while_ += 1;
        self.nest();
        Walk::Continue
    }

    fn exit_while(&mut self, _: &While) {
        self.depth -= 1;
    }

    fn enter_return(&mut self, _: &Return) -> Walk {
        self.statements.return_ += 1;
        Walk::Continue
    }

    fn enter_declare(&mut self, _: &Declare) -> Walk {
        self.statements.declare += 1;
        Walk::Continue
    }

    fn enter_literal(&mut self, _: &Literal) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_identifier(&mut self, _: &Identifier) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_unary(&mut self, _: &Unary) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_binary(&mut self, _: &Binary) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_call(&mut self, node: &Call) -> Walk {
        self.expressions += 1;
        *self.calls.entry(call_name(&node.callee)).or_insert(0) += 1;
        Walk::Continue
    }

    fn enter_argument(&mut self, _: &Argument) -> Walk {
        Walk::Continue
    }

    fn enter_member_access(&mut self, _: &MemberAccess) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_index(&mut self, _: &Index) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_cast(&mut self, _: &Cast) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_new(&mut self, _: &New) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn enter_array_length(&mut self, _: &ArrayLength) -> Walk {
        self.expressions += 1;
        Walk::Continue
    }

    fn visit_type(&mut self, _: &Type) -> Walk {
        Walk::Continue
    }
}

impl fmt::Display for ScriptSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Script: {}", self.name)?;
        writeln!(f, "  Imports:     {}", self.imports)?;
        writeln!(f, "  Variables:   {}", self.variables)?;
        writeln!(f, "  Properties:  {}", self.properties)?;
        writeln!(f, "  Functions:   {}", self.functions)?;
        writeln!(f, "  Events:      {}", self.events)?;
        writeln!(f, "  States:      {}", self.states)?;
        writeln!(f, "  Statements:  {}", self.statements.total())?;
        writeln!(f, "  Expressions: {}", self.expressions)?;
        writeln!(f, "  Max nesting: {}", self.max_depth)?;
        if !self.calls.is_empty() {
            writeln!(f, "  Calls:")?;
            for (name, count) in &self.calls {
                writeln!(f, "    {} x{}", name, count)?;
            }
        }
        Ok(())
    }
}
