//! Depth-first traversal over the syntax tree.
//!
//! Implement [`Visitor`] and hand it to [`walk`]. Each `enter_*` hook decides
//! how the walk proceeds via [`Walk`]. The matching `exit_*` hook runs after
//! the node's children, including when they were skipped.

use crate::ast::*;
use crate::types::Type;
use std::ops::ControlFlow;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Walk {
    /// Visit the node's children.
    #[default]
    Continue,
    /// Skip the children but still call the node's `exit_*` hook.
    SkipChildren,
    /// Abandon the whole walk. No further hooks are called.
    Stop,
}

/// One required `enter_*` hook per node kind, so a new kind of node is a
/// compile error in every visitor until it is handled. `exit_*` hooks are
/// optional.
///
/// A visitor that leaves out any `enter_*` hook does not compile:
///
/// ```compile_fail
/// use papyrus::ast::FunctionDecl;
/// use papyrus::{Visitor, Walk};
///
/// struct OnlyFunctions;
///
/// impl Visitor for OnlyFunctions {
///     fn enter_function(&mut self, _: &FunctionDecl) -> Walk {
///         Walk::Continue
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Visitor {
    fn enter_script(&mut self, node: &Script) -> Walk;
    fn exit_script(&mut self, node: &Script) {}

    fn enter_import(&mut self, node: &Import) -> Walk;
    fn exit_import(&mut self, node: &Import) {}

    fn enter_variable(&mut self, node: &VariableDecl) -> Walk;
    fn exit_variable(&mut self, node: &VariableDecl) {}

    fn enter_property(&mut self, node: &PropertyDecl) -> Walk;
    fn exit_property(&mut self, node: &PropertyDecl) {}

    fn enter_function(&mut self, node: &FunctionDecl) -> Walk;
    fn exit_function(&mut self, node: &FunctionDecl) {}

    fn enter_event(&mut self, node: &EventDecl) -> Walk;
    fn exit_event(&mut self, node: &EventDecl) {}

    fn enter_state(&mut self, node: &StateDecl) -> Walk;
    fn exit_state(&mut self, node: &StateDecl) {}

    fn enter_parameter(&mut self, node: &Parameter) -> Walk;
    fn exit_parameter(&mut self, node: &Parameter) {}

    fn enter_expr_stmt(&mut self, node: &ExprStmt) -> Walk;
    fn exit_expr_stmt(&mut self, node: &ExprStmt) {}

    fn enter_assign(&mut self, node: &Assign) -> Walk;
    fn exit_assign(&mut self, node: &Assign) {}

    fn enter_if(&mut self, node: &If) -> Walk;
    fn exit_if(&mut self, node: &If) {}

    fn enter_branch(&mut self, node: &Branch) -> Walk;
    fn exit_branch(&mut self, node: &Branch) {}

    fn enter_while(&mut self, node: &While) -> Walk;
    fn exit_while(&mut self, node: &While) {}

    fn enter_return(&mut self, node: &Return) -> Walk;
    fn exit_return(&mut self, node: &Return) {}

    fn enter_declare(&mut self, node: &Declare) -> Walk;
    fn exit_declare(&mut self, node: &Declare) {}

    fn enter_literal(&mut self, node: &Literal) -> Walk;
    fn exit_literal(&mut self, node: &Literal) {}

    fn enter_identifier(&mut self, node: &Identifier) -> Walk;
    fn exit_identifier(&mut self, node: &Identifier) {}

    fn enter_unary(&mut self, node: &Unary) -> Walk;
    fn exit_unary(&mut self, node: &Unary) {}

    fn enter_binary(&mut self, node: &Binary) -> Walk;
    fn exit_binary(&mut self, node: &Binary) {}

    fn enter_call(&mut self, node: &Call) -> Walk;
    fn exit_call(&mut self, node: &Call) {}

    fn enter_argument(&mut self, node: &Argument) -> Walk;
    fn exit_argument(&mut self, node: &Argument) {}

    fn enter_member_access(&mut self, node: &MemberAccess) -> Walk;
    fn exit_member_access(&mut self, node: &MemberAccess) {}

    fn enter_index(&mut self, node: &Index) -> Walk;
    fn exit_index(&mut self, node: &Index) {}

    fn enter_cast(&mut self, node: &Cast) -> Walk;
    fn exit_cast(&mut self, node: &Cast) {}

    fn enter_new(&mut self, node: &New) -> Walk;
    fn exit_new(&mut self, node: &New) {}

    fn enter_array_length(&mut self, node: &ArrayLength) -> Walk;
    fn exit_array_length(&mut self, node: &ArrayLength) {}

    /// Called for every type annotation: declarations, parameters, return
    /// types, casts and `New`.
    fn visit_type(&mut self, node: &Type) -> Walk;
}

/// Walks `script` depth-first in source order. Returns `Break` if a hook
/// asked to stop.
pub fn walk<V: Visitor + ?Sized>(script: &Script, visitor: &mut V) -> ControlFlow<()> {
    visit(
        visitor.enter_script(script),
        |v| {
            for import in &script.imports {
                visit(v.enter_import(import), |_| ControlFlow::Continue(()), |v| v.exit_import(import), v)?;
            }
            for member in &script.members {
                walk_member(member, v)?;
            }
            ControlFlow::Continue(())
        },
        |v| v.exit_script(script),
        visitor,
    )
}

/// Runs a node's children between its enter and exit hooks.
fn visit<V: Visitor + ?Sized>(
    entered: Walk,
    children: impl FnOnce(&mut V) -> ControlFlow<()>,
    exit: impl FnOnce(&mut V),
    visitor: &mut V,
) -> ControlFlow<()> {
    match entered {
        Walk::Stop => return ControlFlow::Break(()),
        Walk::Continue => children(visitor)?,
        Walk::SkipChildren => {}
    }
    exit(visitor);
    ControlFlow::Continue(())
}

fn walk_type<V: Visitor + ?Sized>(ty: &Type, visitor: &mut V) -> ControlFlow<()> {
    match visitor.visit_type(ty) {
        Walk::Stop => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    }
}

fn walk_literal<V: Visitor + ?Sized>(literal: &Literal, visitor: &mut V) -> ControlFlow<()> {
    visit(
        visitor.enter_literal(literal),
        |_| ControlFlow::Continue(()),
        |v| v.exit_literal(literal),
        visitor,
    )
}

fn walk_identifier<V: Visitor + ?Sized>(identifier: &Identifier, visitor: &mut V) -> ControlFlow<()> {
    visit(
        visitor.enter_identifier(identifier),
        |_| ControlFlow::Continue(()),
        |v| v.exit_identifier(identifier),
        visitor,
    )
}

fn walk_member<V: Visitor + ?Sized>(member: &Member, visitor: &mut V) -> ControlFlow<()> {
    match member {
        Member::Variable(node) => visit(
            visitor.enter_variable(node),
            |v| {
                walk_type(&node.ty, v)?;
                if let Some(initializer) = &node.initializer {
                    walk_literal(initializer, v)?;
                }
                ControlFlow::Continue(())
            },
            |v| v.exit_variable(node),
            visitor,
        ),
        Member::Property(node) => visit(
            visitor.enter_property(node),
            |v| {
                walk_type(&node.ty, v)?;
                match &node.kind {
                    PropertyKind::Auto { initializer } => {
                        if let Some(initializer) = initializer {
                            walk_literal(initializer, v)?;
                        }
                    }
                    PropertyKind::AutoReadOnly { initializer } => walk_literal(initializer, v)?,
                    PropertyKind::Full { getter, setter } => {
                        for function in getter.iter().chain(setter.iter()) {
                            walk_function(function, v)?;
                        }
                    }
                }
                ControlFlow::Continue(())
            },
            |v| v.exit_property(node),
            visitor,
        ),
        Member::Function(node) => walk_function(node, visitor),
        Member::Event(node) => walk_event(node, visitor),
        Member::State(node) => visit(
            visitor.enter_state(node),
            |v| {
                for event in &node.events {
                    walk_event(event, v)?;
                }
                ControlFlow::Continue(())
            },
            |v| v.exit_state(node),
            visitor,
        ),
    }
}

fn walk_function<V: Visitor + ?Sized>(node: &FunctionDecl, visitor: &mut V) -> ControlFlow<()> {
    visit(
        visitor.enter_function(node),
        |v| {
            if let Some(return_type) = &node.return_type {
                walk_type(return_type, v)?;
            }
            walk_parameters(&node.params, v)?;
            walk_block(&node.body, v)
        },
        |v| v.exit_function(node),
        visitor,
    )
}

fn walk_event<V: Visitor + ?Sized>(node: &EventDecl, visitor: &mut V) -> ControlFlow<()> {
    visit(
        visitor.enter_event(node),
        |v| {
            walk_parameters(&node.params, v)?;
            walk_block(&node.body, v)
        },
        |v| v.exit_event(node),
        visitor,
    )
}

fn walk_parameters<V: Visitor + ?Sized>(params: &[Parameter], visitor: &mut V) -> ControlFlow<()> {
    for param in params {
        visit(
            visitor.enter_parameter(param),
            |v| {
                walk_type(&param.ty, v)?;
                if let Some(default) = &param.default {
                    walk_literal(default, v)?;
                }
                ControlFlow::Continue(())
            },
            |v| v.exit_parameter(param),
            visitor,
        )?;
    }
    ControlFlow::Continue(())
}

fn walk_block<V: Visitor + ?Sized>(body: &[Statement], visitor: &mut V) -> ControlFlow<()> {
    for statement in body {
        walk_statement(statement, visitor)?;
    }
    ControlFlow::Continue(())
}

fn walk_statement<V: Visitor + ?Sized>(statement: &Statement, visitor: &mut V) -> ControlFlow<()> {
    match statement {
        Statement::Expression(node) => visit(
            visitor.enter_expr_stmt(node),
            |v| walk_expression(&node.expr, v),
            |v| v.exit_expr_stmt(node),
            visitor,
        ),
        Statement::Assign(node) => visit(
            visitor.enter_assign(node),
            |v| {
                walk_expression(&node.target, v)?;
                walk_expression(&node.value, v)
            },
            |v| v.exit_assign(node),
            visitor,
        ),
        Statement::If(node) => visit(
            visitor.enter_if(node),
            |v| {
                for branch in &node.branches {
                    visit(
                        v.enter_branch(branch),
                        |v| {
                            walk_expression(&branch.condition, v)?;
                            walk_block(&branch.body, v)
                        },
                        |v| v.exit_branch(branch),
                        v,
                    )?;
                }
                match &node.else_body {
                    Some(body) => walk_block(body, v),
                    None => ControlFlow::Continue(()),
                }
            },
            |v| v.exit_if(node),
            visitor,
        ),
        Statement::While(node) => visit(
            visitor.enter_while(node),
            |v| {
                walk_expression(&node.condition, v)?;
                walk_block(&node.body, v)
            },
            |v| v.exit_while(node),
            visitor,
        ),
        Statement::Return(node) => visit(
            visitor.enter_return(node),
            |v| match &node.value {
                Some(value) => walk_expression(value, v),
                None => ControlFlow::Continue(()),
            },
            |v| v.exit_return(node),
            visitor,
        ),
        Statement::Declare(node) => visit(
            visitor.enter_declare(node),
            |v| {
                walk_type(&node.ty, v)?;
                match &node.initializer {
                    Some(initializer) => walk_expression(initializer, v),
                    None => ControlFlow::Continue(()),
                }
            },
            |v| v.exit_declare(node),
            visitor,
        ),
    }
}

fn walk_expression<V: Visitor + ?Sized>(expression: &Expression, visitor: &mut V) -> ControlFlow<()> {
    match expression {
        Expression::Literal(node) => walk_literal(node, visitor),
        Expression::Identifier(node) => walk_identifier(node, visitor),
        Expression::Unary(node) => visit(
            visitor.enter_unary(node),
            |v| walk_expression(&node.operand, v),
            |v| v.exit_unary(node),
            visitor,
        ),
        Expression::Binary(node) => visit(
            visitor.enter_binary(node),
            |v| {
                walk_expression(&node.left, v)?;
                walk_expression(&node.right, v)
            },
            |v| v.exit_binary(node),
            visitor,
        ),
        Expression::Call(node) => visit(
            visitor.enter_call(node),
            |v| {
                walk_expression(&node.callee, v)?;
                for arg in &node.args {
                    visit(
                        v.enter_argument(arg),
                        |v| walk_expression(&arg.value, v),
                        |v| v.exit_argument(arg),
                        v,
                    )?;
                }
                ControlFlow::Continue(())
            },
            |v| v.exit_call(node),
            visitor,
        ),
        Expression::MemberAccess(node) => visit(
            visitor.enter_member_access(node),
            |v| walk_expression(&node.object, v),
            |v| v.exit_member_access(node),
            visitor,
        ),
        Expression::Index(node) => visit(
            visitor.enter_index(node),
            |v| {
                walk_expression(&node.array, v)?;
                walk_expression(&node.subscript, v)
            },
            |v| v.exit_index(node),
            visitor,
        ),
        Expression::Cast(node) => visit(
            visitor.enter_cast(node),
            |v| {
                walk_expression(&node.expr, v)?;
                walk_type(&node.target, v)
            },
            |v| v.exit_cast(node),
            visitor,
        ),
        Expression::New(node) => visit(
            visitor.enter_new(node),
            |v| {
                walk_type(&node.ty, v)?;
                match &node.size {
                    Some(size) => walk_expression(size, v),
                    None => ControlFlow::Continue(()),
                }
            },
            |v| v.exit_new(node),
            visitor,
        ),
        Expression::ArrayLength(node) => visit(
            visitor.enter_array_length(node),
            |v| walk_expression(&node.array, v),
            |v| v.exit_array_length(node),
            visitor,
        ),
    }
}
