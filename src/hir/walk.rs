//! Every name occurrence of a subtree, tagged with the role it plays.
//!
//! Local-use classification and the cross-file reference finder both walk the
//! tree through this one visitor so they agree on what counts as a use.

use crate::base::{Position, Span};
use crate::parser::ast::{
    ClassSpecifier, CompoundStatement, Condition, Declaration, DeclSpecifiers, Declarator,
    EnumSpecifier, Expression, FunctionDefinition, Initializer, LambdaExpression, NameSegment,
    ParameterDeclaration, QualifiedName, SimpleDeclaration, Statement, TemplateArgument,
    TemplateParameterKind, TranslationUnit, TypeId, TypeSpecifier,
};
use crate::parser::{AstNode, AstPath};

#[derive(Debug, Clone, Copy)]
pub enum NameRole<'a> {
    /// The name a declaration introduces.
    Declaration,
    /// A type or namespace name.
    Type,
    /// An id-expression.
    Expression,
    /// The member of `base.member` / `base->member`.
    Member(&'a Expression),
    /// `member(args)` in a constructor initializer list.
    MemberInitializer,
}

/// One segment of a (possibly qualified) name.
#[derive(Debug, Clone, Copy)]
pub struct NameOccurrence<'a> {
    pub name: &'a [NameSegment],
    pub global: bool,
    pub index: usize,
    pub role: NameRole<'a>,
}

impl<'a> NameOccurrence<'a> {
    pub fn segment(&self) -> &'a NameSegment {
        &self.name[self.index]
    }

    /// A `Foo` in `Foo::bar`.
    pub fn is_qualifier(&self) -> bool {
        self.index + 1 < self.name.len()
    }

    pub fn position(&self) -> Position {
        self.segment().span.start
    }
}

/// A function or lambda body.
#[derive(Debug, Clone, Copy)]
pub enum FunctionBody<'a> {
    Definition(&'a FunctionDefinition),
    Lambda(&'a LambdaExpression),
}

impl FunctionBody<'_> {
    pub fn span(&self) -> Span {
        match self {
            FunctionBody::Definition(f) => f.span,
            FunctionBody::Lambda(l) => l.span,
        }
    }

    pub fn body_span(&self) -> Span {
        match self {
            FunctionBody::Definition(f) => f.body.span,
            FunctionBody::Lambda(l) => l.body.span,
        }
    }
}

/// The innermost function or lambda whose body contains `position`.
pub fn function_at(unit: &TranslationUnit, position: Position) -> Option<FunctionBody<'_>> {
    let path = AstPath::at(unit, position);
    path.nodes().iter().rev().find_map(|node| match node {
        AstNode::Declaration(Declaration::Function(f)) if f.body.span.contains_inclusive(position) => {
            Some(FunctionBody::Definition(f))
        }
        AstNode::Expression(Expression::Lambda(l)) if l.body.span.contains_inclusive(position) => {
            Some(FunctionBody::Lambda(l))
        }
        _ => None,
    })
}

pub fn unit_occurrences(unit: &TranslationUnit) -> Vec<NameOccurrence<'_>> {
    let mut collector = Collector::default();
    collector.declarations(&unit.declarations);
    collector.out
}

pub fn function_occurrences(body: FunctionBody<'_>) -> Vec<NameOccurrence<'_>> {
    let mut collector = Collector::default();
    match body {
        FunctionBody::Definition(f) => collector.function_definition(f),
        FunctionBody::Lambda(l) => collector.lambda(l),
    }
    collector.out
}

#[derive(Default)]
struct Collector<'a> {
    out: Vec<NameOccurrence<'a>>,
}

impl<'a> Collector<'a> {
    fn segments(&mut self, name: &'a [NameSegment], global: bool, role: NameRole<'a>) {
        for index in 0..name.len() {
            self.out.push(NameOccurrence {
                name,
                global,
                index,
                role,
            });
            for arg in name[index].template_args.iter().flatten() {
                match arg {
                    TemplateArgument::Type(t) => self.type_id(t),
                    TemplateArgument::Expression(e) => self.expression(e),
                }
            }
        }
    }

    fn name(&mut self, name: &'a QualifiedName, role: NameRole<'a>) {
        self.segments(&name.segments, name.global, role);
    }

    fn single(&mut self, segment: &'a NameSegment, role: NameRole<'a>) {
        self.segments(std::slice::from_ref(segment), false, role);
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn declarations(&mut self, declarations: &'a [Declaration]) {
        for declaration in declarations {
            self.declaration(declaration);
        }
    }

    fn declaration(&mut self, declaration: &'a Declaration) {
        match declaration {
            Declaration::Simple(simple) => self.simple_declaration(simple),
            Declaration::Function(f) => self.function_definition(f),
            Declaration::Namespace(n) => {
                if let Some(name) = &n.name {
                    self.single(name, NameRole::Declaration);
                }
                self.declarations(&n.members);
            }
            Declaration::Template(t) => {
                for param in &t.params {
                    if let TemplateParameterKind::Value(specifiers) = &param.kind {
                        self.specifiers(specifiers);
                    }
                    if let Some(name) = &param.name {
                        self.single(name, NameRole::Declaration);
                    }
                }
                self.declaration(&t.declaration);
            }
            Declaration::Linkage { members, .. } => self.declarations(members),
            Declaration::UsingDirective { name, .. } => self.name(name, NameRole::Type),
            Declaration::Using { name, .. } => self.name(name, NameRole::Expression),
            Declaration::Alias { name, type_id, .. } => {
                self.single(name, NameRole::Declaration);
                self.type_id(type_id);
            }
            Declaration::Access { .. } | Declaration::Empty(_) | Declaration::Error(_) => {}
        }
    }

    fn simple_declaration(&mut self, simple: &'a SimpleDeclaration) {
        self.specifiers(&simple.specifiers);
        let declaring = !simple.specifiers.flags.is_friend;
        for init in &simple.declarators {
            self.declarator(&init.declarator, declaring);
            match &init.initializer {
                Some(Initializer::Assign(e)) => self.expression(e),
                Some(Initializer::Braced(list)) | Some(Initializer::Call(list)) => self.expressions(list),
                None => {}
            }
            if let Some(width) = &init.bit_width {
                self.expression(width);
            }
        }
    }

    fn function_definition(&mut self, function: &'a FunctionDefinition) {
        self.specifiers(&function.specifiers);
        self.declarator(&function.declarator, true);
        for init in &function.ctor_initializers {
            self.name(&init.name, NameRole::MemberInitializer);
            self.expressions(&init.args);
        }
        self.compound(&function.body);
    }

    fn specifiers(&mut self, specifiers: &'a DeclSpecifiers) {
        match &specifiers.type_spec {
            Some(TypeSpecifier::Named(name)) | Some(TypeSpecifier::Elaborated { name, .. }) => {
                self.name(name, NameRole::Type)
            }
            Some(TypeSpecifier::Class(class)) => self.class(class),
            Some(TypeSpecifier::Enum(e)) => self.enumeration(e),
            Some(TypeSpecifier::Builtin { .. }) | None => {}
        }
    }

    fn class(&mut self, class: &'a ClassSpecifier) {
        if let Some(name) = &class.name {
            self.name(name, NameRole::Declaration);
        }
        for base in &class.bases {
            self.name(&base.name, NameRole::Type);
        }
        self.declarations(&class.members);
    }

    fn enumeration(&mut self, e: &'a EnumSpecifier) {
        if let Some(name) = &e.name {
            self.single(name, NameRole::Declaration);
        }
        for enumerator in &e.enumerators {
            self.single(&enumerator.name, NameRole::Declaration);
            if let Some(value) = &enumerator.value {
                self.expression(value);
            }
        }
    }

    fn declarator(&mut self, declarator: &'a Declarator, declaring: bool) {
        if let Some(name) = &declarator.name {
            let role = if declaring {
                NameRole::Declaration
            } else {
                NameRole::Expression
            };
            self.name(name, role);
        }
        if let Some(function) = &declarator.function {
            self.parameters(&function.params);
            if let Some(trailing) = &function.trailing_return {
                self.type_id(trailing);
            }
        }
    }

    fn parameters(&mut self, params: &'a [ParameterDeclaration]) {
        for param in params {
            self.specifiers(&param.specifiers);
            self.declarator(&param.declarator, true);
            if let Some(value) = &param.default_value {
                self.expression(value);
            }
        }
    }

    fn type_id(&mut self, type_id: &'a TypeId) {
        self.specifiers(&type_id.specifiers);
        self.declarator(&type_id.declarator, false);
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn compound(&mut self, compound: &'a CompoundStatement) {
        for statement in &compound.statements {
            self.statement(statement);
        }
    }

    fn condition(&mut self, condition: &'a Condition) {
        match condition {
            Condition::Expression(e) => self.expression(e),
            Condition::Declaration(d) => self.simple_declaration(d),
        }
    }

    fn statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Compound(c) => self.compound(c),
            Statement::Declaration(d) => self.declaration(d),
            Statement::Expression { expression, .. } => self.expression(expression),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.condition(condition);
                self.statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.statement(else_branch);
                }
            }
            Statement::While { condition, body, .. } | Statement::Switch { condition, body, .. } => {
                self.condition(condition);
                self.statement(body);
            }
            Statement::Do { body, condition, .. } => {
                self.statement(body);
                self.expression(condition);
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.statement(init);
                }
                if let Some(condition) = condition {
                    self.condition(condition);
                }
                if let Some(step) = step {
                    self.expression(step);
                }
                self.statement(body);
            }
            Statement::ForRange {
                declaration,
                range,
                body,
                ..
            } => {
                self.simple_declaration(declaration);
                self.expression(range);
                self.statement(body);
            }
            Statement::Case { value, .. } | Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) | Statement::Error(_) => {}
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn expressions(&mut self, expressions: &'a [Expression]) {
        for expression in expressions {
            self.expression(expression);
        }
    }

    fn lambda(&mut self, lambda: &'a LambdaExpression) {
        for capture in &lambda.captures {
            self.single(capture, NameRole::Expression);
        }
        self.parameters(&lambda.params);
        self.compound(&lambda.body);
    }

    fn expression(&mut self, expression: &'a Expression) {
        match expression {
            Expression::Name(name) => self.name(name, NameRole::Expression),
            Expression::Member { base, member, .. } => {
                self.expression(base);
                self.name(member, NameRole::Member(base));
            }
            Expression::Call { callee, args, .. } => {
                self.expression(callee);
                self.expressions(args);
            }
            Expression::Subscript { base, index, .. } => {
                self.expression(base);
                self.expression(index);
            }
            Expression::Unary { operand, .. } | Expression::Delete { operand, .. } => {
                self.expression(operand)
            }
            Expression::Binary { lhs, rhs, .. } => {
                self.expression(lhs);
                self.expression(rhs);
            }
            Expression::Conditional {
                condition,
                then_value,
                else_value,
                ..
            } => {
                self.expression(condition);
                self.expression(then_value);
                self.expression(else_value);
            }
            Expression::Cast { type_id, operand, .. } => {
                self.type_id(type_id);
                self.expression(operand);
            }
            Expression::SizeofType { type_id, .. } => self.type_id(type_id),
            Expression::New { type_id, args, .. } => {
                self.type_id(type_id);
                self.expressions(args);
            }
            Expression::Lambda(lambda) => self.lambda(lambda),
            Expression::Braced { elements, .. } => self.expressions(elements),
            Expression::Literal { .. }
            | Expression::This(_)
            | Expression::QtMethod { .. }
            | Expression::Error(_) => {}
        }
    }
}
