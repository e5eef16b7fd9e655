use tree_sitter::Node;

/// Closed set of Java grammar constructs the engine reasons about.
///
/// Every node is classified once through [`NodeKind::of`]; query sites match on
/// the variant instead of comparing grammar strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    ClassDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    AnnotationTypeDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    FieldDeclaration,
    ConstantDeclaration,
    ClassBody,
    InterfaceBody,
    Modifiers,
    MarkerAnnotation,
    Annotation,
    Throws,
    Identifier,
    TypeIdentifier,
    ScopedTypeIdentifier,
    GenericType,
    TypeArguments,
    TypeParameters,
    TypeParameter,
    FormalParameters,
    FormalParameter,
    SpreadParameter,
    VariableDeclarator,
    Superclass,
    SuperInterfaces,
    ExtendsInterfaces,
    LineComment,
    BlockComment,
    MethodInvocation,
    FieldAccess,
    ArrayAccess,
    ArgumentList,
    LocalVariableDeclaration,
    /// Any `*_literal` node: numbers, strings, characters, `null`, `Foo.class`.
    Literal,
    PackageDeclaration,
    ImportDeclaration,
    Other,
}

impl NodeKind {
    pub fn of(node: Node<'_>) -> Self {
        Self::from_grammar(node.kind())
    }

    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "program" => Self::Program,
            "class_declaration" => Self::ClassDeclaration,
            "interface_declaration" => Self::InterfaceDeclaration,
            "enum_declaration" => Self::EnumDeclaration,
            "record_declaration" => Self::RecordDeclaration,
            "annotation_type_declaration" => Self::AnnotationTypeDeclaration,
            "method_declaration" => Self::MethodDeclaration,
            "constructor_declaration" => Self::ConstructorDeclaration,
            "field_declaration" => Self::FieldDeclaration,
            "constant_declaration" => Self::ConstantDeclaration,
            "class_body" => Self::ClassBody,
            "interface_body" => Self::InterfaceBody,
            "modifiers" => Self::Modifiers,
            "marker_annotation" => Self::MarkerAnnotation,
            "annotation" => Self::Annotation,
            "throws" => Self::Throws,
            "identifier" => Self::Identifier,
            "type_identifier" => Self::TypeIdentifier,
            "scoped_type_identifier" => Self::ScopedTypeIdentifier,
            "generic_type" => Self::GenericType,
            "type_arguments" => Self::TypeArguments,
            "type_parameters" => Self::TypeParameters,
            "type_parameter" => Self::TypeParameter,
            "formal_parameters" => Self::FormalParameters,
            "formal_parameter" => Self::FormalParameter,
            "spread_parameter" => Self::SpreadParameter,
            "variable_declarator" => Self::VariableDeclarator,
            "superclass" => Self::Superclass,
            "super_interfaces" => Self::SuperInterfaces,
            "extends_interfaces" => Self::ExtendsInterfaces,
            "line_comment" => Self::LineComment,
            "block_comment" => Self::BlockComment,
            "method_invocation" => Self::MethodInvocation,
            "field_access" => Self::FieldAccess,
            "array_access" => Self::ArrayAccess,
            "argument_list" => Self::ArgumentList,
            "local_variable_declaration" => Self::LocalVariableDeclaration,
            "package_declaration" => Self::PackageDeclaration,
            "import_declaration" => Self::ImportDeclaration,
            literal if literal.ends_with("_literal") => Self::Literal,
            _ => Self::Other,
        }
    }

    /// Class-like declarations whose members can be split.
    #[must_use]
    pub fn is_type_declaration(self) -> bool {
        matches!(self, Self::ClassDeclaration | Self::InterfaceDeclaration)
    }

    #[must_use]
    pub fn is_callable(self) -> bool {
        matches!(self, Self::MethodDeclaration | Self::ConstructorDeclaration)
    }

    #[must_use]
    pub fn is_comment(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }

    #[must_use]
    pub fn is_annotation(self) -> bool {
        matches!(self, Self::MarkerAnnotation | Self::Annotation)
    }

    /// Expressions that reach into an object: calls, field and array accesses.
    #[must_use]
    pub fn is_member_access(self) -> bool {
        matches!(self, Self::MethodInvocation | Self::FieldAccess | Self::ArrayAccess)
    }
}

/// Grammatical role of a child node, used by [`super::named_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Name,
    Type,
    Parameters,
    Body,
    Modifiers,
    Superclass,
    Interfaces,
    TypeParameters,
    Declarator,
    Arguments,
    Value,
}

impl Role {
    /// Grammar field backing this role, when the grammar exposes one.
    pub(crate) fn field_name(self) -> Option<&'static str> {
        match self {
            Self::Name => Some("name"),
            Self::Type => Some("type"),
            Self::Parameters => Some("parameters"),
            Self::Body => Some("body"),
            Self::Superclass => Some("superclass"),
            Self::Interfaces => Some("interfaces"),
            Self::TypeParameters => Some("type_parameters"),
            Self::Declarator => Some("declarator"),
            Self::Arguments => Some("arguments"),
            Self::Value => Some("value"),
            Self::Modifiers => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grammar() {
        assert_eq!(NodeKind::from_grammar("method_declaration"), NodeKind::MethodDeclaration);
        assert_eq!(NodeKind::from_grammar("block_comment"), NodeKind::BlockComment);
        assert_eq!(NodeKind::from_grammar("lambda_expression"), NodeKind::Other);
        assert_eq!(NodeKind::from_grammar("string_literal"), NodeKind::Literal);
        assert_eq!(NodeKind::from_grammar("hex_integer_literal"), NodeKind::Literal);
        assert!(NodeKind::FieldAccess.is_member_access());
        assert!(!NodeKind::ArgumentList.is_member_access());
        assert!(NodeKind::ConstructorDeclaration.is_callable());
        assert!(NodeKind::InterfaceDeclaration.is_type_declaration());
        assert!(!NodeKind::EnumDeclaration.is_type_declaration());
    }
}
