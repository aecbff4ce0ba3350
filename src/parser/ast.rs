//! Abstract syntax tree for the C++ subset the model understands.
//!
//! The node set is closed: declarations, statements and expressions are enums
//! and every consumer matches on them exhaustively. Names carry their text and
//! position directly so resolution never needs the token stream.

use smol_str::SmolStr;

use super::token_kind::TokenKind;
use crate::base::{Position, Span};

// ============================================================================
// Names
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Identifier,
    /// `~Foo`
    Destructor,
    /// `operator+`, `operator()`
    Operator,
    /// `operator bool`
    Conversion,
}

/// One `::`-separated component of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSegment {
    pub kind: NameKind,
    pub text: SmolStr,
    pub span: Span,
    pub generated: bool,
    pub template_args: Option<Vec<TemplateArgument>>,
}

impl NameSegment {
    /// Identifier text without the `~` of destructors.
    pub fn identifier(&self) -> &str {
        self.text.trim_start_matches('~')
    }
}

/// A possibly qualified name like `::std::vector<int>` or `Foo::~Foo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub global: bool,
    pub segments: Vec<NameSegment>,
    pub span: Span,
}

impl QualifiedName {
    /// The unqualified name (last segment).
    pub fn last(&self) -> &NameSegment {
        // the parser never builds an empty name
        &self.segments[self.segments.len() - 1]
    }

    pub fn qualifier(&self) -> &[NameSegment] {
        &self.segments[..self.segments.len() - 1]
    }

    pub fn is_qualified(&self) -> bool {
        self.global || self.segments.len() > 1
    }

    /// Segment texts, template arguments dropped.
    pub fn path(&self) -> Vec<SmolStr> {
        self.segments.iter().map(|s| s.text.clone()).collect()
    }

    /// Index of the segment at `position`, if any.
    pub fn segment_at(&self, position: Position) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.span.contains_inclusive(position))
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.global {
            f.write_str("::")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(&segment.text)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArgument {
    Type(TypeId),
    Expression(Expression),
}

// ============================================================================
// Specifiers and declarators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSpecifier {
    pub name: QualifiedName,
    pub access: Option<Access>,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpecifier {
    pub key: ClassKey,
    pub name: Option<QualifiedName>,
    pub bases: Vec<BaseSpecifier>,
    pub members: Vec<Declaration>,
    /// From `{` to `}`.
    pub body: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: NameSegment,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpecifier {
    pub name: Option<NameSegment>,
    pub scoped: bool,
    pub enumerators: Vec<Enumerator>,
    pub body: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpecifier {
    /// `unsigned long`, `void`, `auto` ...
    Builtin { text: SmolStr, span: Span },
    Named(QualifiedName),
    /// `class Foo` / `struct Foo` / `enum Foo` without a body.
    Elaborated {
        key: Option<ClassKey>,
        name: QualifiedName,
        span: Span,
    },
    Class(Box<ClassSpecifier>),
    Enum(Box<EnumSpecifier>),
}

impl TypeSpecifier {
    pub fn span(&self) -> Span {
        match self {
            TypeSpecifier::Builtin { span, .. } | TypeSpecifier::Elaborated { span, .. } => *span,
            TypeSpecifier::Named(name) => name.span,
            TypeSpecifier::Class(class) => class.span,
            TypeSpecifier::Enum(e) => e.span,
        }
    }
}

/// Storage class and function specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Specifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_typedef: bool,
    pub is_friend: bool,
    pub is_inline: bool,
    pub is_explicit: bool,
    pub is_extern: bool,
    pub is_mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeclSpecifiers {
    pub flags: Specifiers,
    pub is_const: bool,
    pub is_volatile: bool,
    pub type_spec: Option<TypeSpecifier>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrOperator {
    Pointer { is_const: bool },
    Reference,
    RValueReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDeclaration {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub default_value: Option<Expression>,
    pub span: Span,
}

/// The `( params ) const` part of a function declarator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclarator {
    pub params: Vec<ParameterDeclaration>,
    pub variadic: bool,
    pub is_const: bool,
    pub is_pure: bool,
    pub is_override: bool,
    pub trailing_return: Option<Box<TypeId>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    pub ptr_ops: Vec<PtrOperator>,
    /// `None` for abstract declarators (`int*` in a parameter list).
    pub name: Option<QualifiedName>,
    pub function: Option<FunctionDeclarator>,
    /// `(*name)(...)`
    pub is_function_pointer: bool,
    pub array_dims: u32,
    pub span: Span,
}

impl Declarator {
    pub fn is_function(&self) -> bool {
        self.function.is_some() && !self.is_function_pointer
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initializer {
    /// `= expr`
    Assign(Expression),
    /// `{ ... }` or `= { ... }`
    Braced(Vec<Expression>),
    /// `( ... )`
    Call(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub initializer: Option<Initializer>,
    /// Bit-field width.
    pub bit_width: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeId {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub span: Span,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleDeclaration {
    pub specifiers: DeclSpecifiers,
    pub declarators: Vec<InitDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemInitializer {
    pub name: QualifiedName,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub ctor_initializers: Vec<MemInitializer>,
    pub body: CompoundStatement,
    pub span: Span,
}

impl FunctionDefinition {
    pub fn name(&self) -> Option<&QualifiedName> {
        self.declarator.name.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDefinition {
    pub name: Option<NameSegment>,
    pub members: Vec<Declaration>,
    pub body: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateParameterKind {
    /// `class T` / `typename T`
    Type,
    /// `int N`
    Value(DeclSpecifiers),
    /// `template <class> class T`
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateParameter {
    pub kind: TemplateParameterKind,
    pub name: Option<NameSegment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDeclaration {
    pub params: Vec<TemplateParameter>,
    pub declaration: Box<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Simple(SimpleDeclaration),
    Function(Box<FunctionDefinition>),
    Namespace(NamespaceDefinition),
    Template(TemplateDeclaration),
    /// `extern "C" { ... }`
    Linkage { members: Vec<Declaration>, span: Span },
    /// `using namespace std;`
    UsingDirective { name: QualifiedName, span: Span },
    /// `using std::string;`
    Using { name: QualifiedName, span: Span },
    /// `using Alias = Type;`
    Alias {
        name: NameSegment,
        type_id: TypeId,
        span: Span,
    },
    /// `public:`, `signals:`, `private slots:` ...
    Access {
        access: Access,
        signals: bool,
        slots: bool,
        span: Span,
    },
    Empty(Span),
    /// Text the parser could not make sense of.
    Error(Span),
}

impl Declaration {
    pub fn span(&self) -> Span {
        match self {
            Declaration::Simple(d) => d.span,
            Declaration::Function(f) => f.span,
            Declaration::Namespace(n) => n.span,
            Declaration::Template(t) => t.span,
            Declaration::Linkage { span, .. }
            | Declaration::UsingDirective { span, .. }
            | Declaration::Using { span, .. }
            | Declaration::Alias { span, .. }
            | Declaration::Access { span, .. }
            | Declaration::Empty(span)
            | Declaration::Error(span) => *span,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundStatement {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Expression(Expression),
    Declaration(Box<SimpleDeclaration>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Compound(CompoundStatement),
    Declaration(Box<Declaration>),
    Expression {
        expression: Expression,
        span: Span,
    },
    If {
        condition: Condition,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    While {
        condition: Condition,
        body: Box<Statement>,
        span: Span,
    },
    Do {
        body: Box<Statement>,
        condition: Expression,
        span: Span,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Condition>,
        step: Option<Expression>,
        body: Box<Statement>,
        span: Span,
    },
    /// `for (decl : range)`
    ForRange {
        declaration: Box<SimpleDeclaration>,
        range: Expression,
        body: Box<Statement>,
        span: Span,
    },
    Switch {
        condition: Condition,
        body: Box<Statement>,
        span: Span,
    },
    /// `case value:` or `default:` (value `None`).
    Case {
        value: Option<Expression>,
        span: Span,
    },
    Return {
        value: Option<Expression>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Empty(Span),
    Error(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Compound(c) => c.span,
            Statement::Declaration(d) => d.span(),
            Statement::Expression { span, .. }
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Do { span, .. }
            | Statement::For { span, .. }
            | Statement::ForRange { span, .. }
            | Statement::Switch { span, .. }
            | Statement::Case { span, .. }
            | Statement::Return { span, .. }
            | Statement::Break(span)
            | Statement::Continue(span)
            | Statement::Empty(span)
            | Statement::Error(span) => *span,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Static,
    Dynamic,
    Const,
    Reinterpret,
    /// `(T)expr`
    CStyle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaExpression {
    pub captures: Vec<NameSegment>,
    pub params: Vec<ParameterDeclaration>,
    pub body: CompoundStatement,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Name(QualifiedName),
    Literal {
        kind: TokenKind,
        text: SmolStr,
        span: Span,
    },
    This(Span),
    Member {
        base: Box<Expression>,
        arrow: bool,
        member: QualifiedName,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Span,
    },
    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },
    Unary {
        op: TokenKind,
        operand: Box<Expression>,
        postfix: bool,
        span: Span,
    },
    /// Binary, assignment and comma operators.
    Binary {
        op: TokenKind,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        span: Span,
    },
    Conditional {
        condition: Box<Expression>,
        then_value: Box<Expression>,
        else_value: Box<Expression>,
        span: Span,
    },
    Cast {
        kind: CastKind,
        type_id: Box<TypeId>,
        operand: Box<Expression>,
        span: Span,
    },
    /// `sizeof(T)`
    SizeofType { type_id: Box<TypeId>, span: Span },
    New {
        type_id: Box<TypeId>,
        args: Vec<Expression>,
        span: Span,
    },
    Delete {
        operand: Box<Expression>,
        span: Span,
    },
    Lambda(Box<LambdaExpression>),
    /// `{ a, b }`
    Braced { elements: Vec<Expression>, span: Span },
    /// Qt `SIGNAL(...)` / `SLOT(...)`; `content` covers the parenthesised text.
    QtMethod {
        is_signal: bool,
        content: Span,
        span: Span,
    },
    Error(Span),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Name(name) => name.span,
            Expression::Lambda(lambda) => lambda.span,
            Expression::Literal { span, .. }
            | Expression::Member { span, .. }
            | Expression::Call { span, .. }
            | Expression::Subscript { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Cast { span, .. }
            | Expression::SizeofType { span, .. }
            | Expression::New { span, .. }
            | Expression::Delete { span, .. }
            | Expression::Braced { span, .. }
            | Expression::QtMethod { span, .. }
            | Expression::This(span)
            | Expression::Error(span) => *span,
        }
    }
}

/// Root of a parsed file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationUnit {
    pub declarations: Vec<Declaration>,
}
