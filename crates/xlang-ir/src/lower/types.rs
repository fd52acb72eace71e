//! Resolution of surface type syntax to IR types.

use xlang_ast::{Node, TypeExpr};

use super::{LowerError, LowerErrorKind};
use crate::IrType;

/// Maps a base type name to its IR type. `Int` is the only base name.
pub fn resolve_type(name: &str) -> Result<IrType, LowerErrorKind> {
    match name {
        "Int" => Ok(IrType::I32),
        _ => Err(LowerErrorKind::UnknownType {
            name: name.to_string(),
        }),
    }
}

pub fn pointer_of(pointee: IrType) -> IrType {
    pointee.pointer_to()
}

/// Resolves a full type annotation, reporting the span of the bad name.
pub fn lower_type(ty: &Node<TypeExpr>) -> Result<IrType, LowerError> {
    match &ty.value {
        TypeExpr::Named(name) => resolve_type(&name.name).map_err(|kind| LowerError::new(kind, ty.span)),
        TypeExpr::Pointer(pointee) => Ok(pointer_of(lower_type(pointee)?)),
    }
}
