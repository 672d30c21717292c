//! Assignable-location check for reference-mode compilation.

use crate::expr::Expr;
use crate::types::{MethodKind, TypeUniverse};

/// Outcome of inspecting the outermost node of a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationCheck {
    Location,
    /// Not assignable; carries an explanatory fragment when one is known.
    NotLocation(Option<String>),
}

impl LocationCheck {
    pub fn is_location(&self) -> bool {
        matches!(self, LocationCheck::Location)
    }
}

/// Whether `expr` denotes a location that can be written through.
///
/// This is decided from the node's shape only: parameters, settable fields and
/// properties, array elements, settable indexers, and assignment targets.
pub fn check_location(expr: &Expr, universe: &TypeUniverse) -> LocationCheck {
    match expr {
        Expr::Parameter(_) | Expr::ArrayIndex(_) => LocationCheck::Location,
        Expr::Assign(assign) => check_location(&assign.target, universe),
        Expr::MemberAccess(member_access) => {
            let member = &member_access.member;
            if !member.is_settable() {
                return LocationCheck::NotLocation(Some(format!(
                    "member `{}` of `{}` is read-only",
                    member.name,
                    universe.display_name(member.declaring_type)
                )));
            }
            match &member_access.receiver {
                // members of a value-typed temporary cannot be written back
                Some(receiver)
                    if universe.is_value_type(receiver.ty())
                        && !matches!(check_location(receiver, universe), LocationCheck::Location) =>
                {
                    LocationCheck::NotLocation(Some(format!(
                        "member `{}` belongs to a value-type temporary",
                        member.name
                    )))
                }
                _ => LocationCheck::Location,
            }
        }
        Expr::Call(call) => match call.method.kind {
            MethodKind::IndexerGet { settable: true } => LocationCheck::Location,
            MethodKind::IndexerGet { settable: false } => LocationCheck::NotLocation(Some(format!(
                "indexer of `{}` is read-only",
                universe.display_name(call.method.declaring_type)
            ))),
            MethodKind::Ordinary => LocationCheck::NotLocation(None),
        },
        Expr::Binary(_)
        | Expr::Conditional(_)
        | Expr::Constant(_)
        | Expr::Invoke(_)
        | Expr::Lambda(_)
        | Expr::ListInit(_)
        | Expr::MemberInit(_)
        | Expr::NewArray(_)
        | Expr::New(_)
        | Expr::TypeIs(_)
        | Expr::Convert(_)
        | Expr::Unary(_)
        | Expr::Block(_) => LocationCheck::NotLocation(None),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::expr::{ArrayIndexExpr, AssignExpr, BinaryOp, ConvertKind};
    use crate::types::{AssemblyName, MethodRef, TypeDef, TypeId};

    fn universe_with_point() -> (TypeUniverse, TypeId, TypeId) {
        let mut universe = TypeUniverse::new();
        let core = *universe.core();
        let asm = universe.define_assembly(AssemblyName::new("Geometry"), false);
        let point = universe.define_type(TypeDef::structure("Geometry", "Point", asm).with_base(core.value_type));
        universe.add_field(point, "X", core.int32, false);
        let shape = universe.define_type(TypeDef::class("Geometry", "Shape", asm).with_base(core.object));
        universe.add_property(shape, "Origin", point, false);
        universe.add_property(shape, "Id", core.int32, false);
        universe.add_property(shape, "Name", core.string, true);
        universe.add_indexer(shape, vec![core.int32], point, true);
        universe.add_indexer(point, vec![core.int32], core.int32, false);
        (universe, point, shape)
    }

    #[rstest]
    #[case::parameter("param")]
    #[case::settable_property("name")]
    #[case::array_element("array")]
    #[case::settable_indexer("indexer")]
    #[case::assignment("assign")]
    #[case::field_of_value_parameter("point_field")]
    fn test_locations(#[case] which: &str) {
        let (mut universe, point, shape) = universe_with_point();
        let core = *universe.core();
        let shape_param = Expr::parameter("s", shape);
        let expr = match which {
            "param" => Expr::parameter("x", core.int32),
            "name" => Expr::member(Some(shape_param), universe.find_member(shape, "Name").cloned().unwrap()),
            "array" => Expr::ArrayIndex(ArrayIndexExpr {
                array: Box::new(Expr::parameter("a", universe.array_of(core.int32, 1))),
                indexes: vec![Expr::int(&universe, 0)],
                ty: core.int32,
            }),
            "indexer" => Expr::call(
                Some(shape_param),
                universe.find_indexer(shape).cloned().unwrap(),
                vec![Expr::int(&universe, 0)],
            ),
            "assign" => Expr::Assign(AssignExpr {
                target: Box::new(Expr::parameter("x", core.int32)),
                value: Box::new(Expr::int(&universe, 1)),
                ty: core.int32,
            }),
            "point_field" => Expr::member(
                Some(Expr::parameter("p", point)),
                universe.find_member(point, "X").cloned().unwrap(),
            ),
            _ => unreachable!(),
        };
        assert_eq!(check_location(&expr, &universe), LocationCheck::Location);
    }

    #[test]
    fn test_read_only_property() {
        let (universe, _, shape) = universe_with_point();
        let expr = Expr::member(
            Some(Expr::parameter("s", shape)),
            universe.find_member(shape, "Id").cloned().unwrap(),
        );
        assert_eq!(
            check_location(&expr, &universe),
            LocationCheck::NotLocation(Some("member `Id` of `Shape` is read-only".to_string()))
        );
    }

    #[test]
    fn test_field_of_value_type_temporary() {
        let (universe, point, shape) = universe_with_point();
        let origin = Expr::member(
            Some(Expr::parameter("s", shape)),
            universe.find_member(shape, "Origin").cloned().unwrap(),
        );
        let expr = Expr::member(Some(origin), universe.find_member(point, "X").cloned().unwrap());
        let check = check_location(&expr, &universe);
        assert!(!check.is_location());
    }

    #[test]
    fn test_read_only_indexer() {
        let (universe, point, _) = universe_with_point();
        let expr = Expr::call(
            Some(Expr::parameter("p", point)),
            universe.find_indexer(point).cloned().unwrap(),
            vec![Expr::int(&universe, 0)],
        );
        assert_eq!(
            check_location(&expr, &universe),
            LocationCheck::NotLocation(Some("indexer of `Point` is read-only".to_string()))
        );
    }

    #[test]
    fn test_values_are_not_locations() {
        let (universe, _, _) = universe_with_point();
        let core = *universe.core();
        let sum = Expr::binary(BinaryOp::Add, Expr::int(&universe, 1), Expr::int(&universe, 1), core.int32);
        assert_eq!(check_location(&sum, &universe), LocationCheck::NotLocation(None));
        assert!(!check_location(&Expr::int(&universe, 1), &universe).is_location());

        let converted = Expr::convert(ConvertKind::Convert, Expr::parameter("x", core.int32), core.int64);
        assert!(!check_location(&converted, &universe).is_location());

        let call = Expr::call(None, MethodRef::new("Abs", core.math, vec![core.int32], core.int32), vec![]);
        assert_eq!(check_location(&call, &universe), LocationCheck::NotLocation(None));
    }
}
