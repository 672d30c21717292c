//! Closure and import properties over hand-built expression trees.

use std::sync::Arc;
use std::thread;

use flowexpr::expr::{
    BinaryOp, BlockExpr, ConditionalExpr, ConvertKind, InvokeExpr, LambdaExpr, NewArrayExpr, NewArrayKind, NewExpr,
    ParameterExpr, TypeIsExpr,
};
use flowexpr::types::{MethodRef, TypeDef};
use flowexpr::{
    AssemblyName, DefaultAssemblies, EngineConfig, Expr, ImportRecord, ImportSettings, TypeId, TypeUniverse,
    collect_type_references,
};
use rstest::{fixture, rstest};

struct Model {
    universe: TypeUniverse,
    shape: TypeId,
    circle: TypeId,
    drawable: TypeId,
    palette: TypeId,
    pair_of_shape_and_palette: TypeId,
}

/// `Geometry.Circle : Geometry.Shape : Object`, `Shape : IDrawable`,
/// `Paint.Palette` in a separate assembly, and `Geometry.Pair<Shape, Palette>`.
#[fixture]
fn model() -> Model {
    let mut universe = TypeUniverse::new();
    let core = *universe.core();
    let geometry = universe.define_assembly(AssemblyName::new("Geometry").with_version("2.0.0.0"), false);
    let paint = universe.define_assembly(AssemblyName::new("Paint"), false);

    let drawable = universe.define_type(TypeDef::interface("Geometry", "IDrawable", geometry));
    let shape = universe.define_type(
        TypeDef::class("Geometry", "Shape", geometry)
            .with_base(core.object)
            .with_interfaces([drawable, core.icloneable]),
    );
    let circle = universe.define_type(TypeDef::class("Geometry", "Circle", geometry).with_base(shape));
    universe.add_property(circle, "Radius", core.double, true);
    universe.add_constructor(circle, vec![core.double]);
    let palette = universe.define_type(TypeDef::class("Paint", "Palette", paint).with_base(core.object));

    let pair = universe.define_type(
        TypeDef::class("Geometry", "Pair", geometry)
            .with_base(core.object)
            .with_generic_parameters(&["TFirst", "TSecond"]),
    );
    let pair_of_shape_and_palette = universe.make_generic(pair, vec![shape, palette]).unwrap();

    Model {
        universe,
        shape,
        circle,
        drawable,
        palette,
        pair_of_shape_and_palette,
    }
}

fn defaults() -> DefaultAssemblies {
    EngineConfig::default().default_assemblies()
}

fn closure_of(expr: &Expr, universe: &TypeUniverse) -> Vec<TypeId> {
    collect_type_references(expr, universe, &defaults()).into_iter().collect()
}

#[rstest]
fn test_hierarchy_is_expanded_for_every_non_default_type(model: Model) {
    let expr = Expr::parameter("c", model.circle);
    let closure = closure_of(&expr, &model.universe);

    assert_eq!(closure, vec![model.circle, model.shape, model.drawable]);
    for ty in &closure {
        let mut base = model.universe.base_type(*ty);
        while let Some(b) = base.filter(|b| *b != model.universe.object()) {
            assert!(closure.contains(&b));
            base = model.universe.base_type(b);
        }
        for interface in model.universe.interfaces(*ty) {
            assert!(
                closure.contains(interface) || defaults().defines(&model.universe, *interface),
                "missing interface {}",
                model.universe.full_name(*interface)
            );
        }
    }
}

#[rstest]
fn test_default_types_are_filtered_unless_direct(model: Model) {
    let core = *model.universe.core();

    let indirect = Expr::parameter("d", core.double);
    assert!(closure_of(&indirect, &model.universe).is_empty());

    let direct = Expr::convert(ConvertKind::Convert, Expr::parameter("i", core.int32), core.double);
    assert_eq!(closure_of(&direct, &model.universe), vec![core.double]);

    let settings = ImportSettings::from_types(&closure_of(&direct, &model.universe), &model.universe);
    assert!(settings.contains(&ImportRecord::new("System.Private.CoreLib", Some("System"))));
}

#[rstest]
fn test_closed_generic_contributes_non_first_arguments(model: Model) {
    let expr = Expr::parameter("p", model.pair_of_shape_and_palette);
    let closure = closure_of(&expr, &model.universe);

    assert!(closure.contains(&model.pair_of_shape_and_palette));
    assert!(closure.contains(&model.palette));
    assert!(!closure.contains(&model.shape));
}

#[rstest]
fn test_nested_nodes_are_all_reached(model: Model) {
    let core = *model.universe.core();
    let mut universe = model.universe;
    let circles = universe.array_of(model.circle, 1);
    let x = ParameterExpr {
        name: "x".into(),
        ty: core.int32,
    };

    let make_circle = Expr::New(NewExpr {
        constructor: universe.constructors(model.circle).first().cloned(),
        arguments: vec![Expr::parameter("r", core.double)],
        ty: model.circle,
    });
    let array = Expr::NewArray(NewArrayExpr {
        kind: NewArrayKind::Init,
        expressions: vec![make_circle],
        ty: circles,
    });
    let lambda = Expr::Lambda(LambdaExpr {
        parameters: vec![x.clone()],
        body: Box::new(Expr::TypeIs(TypeIsExpr {
            operand: Box::new(Expr::parameter("o", core.object)),
            type_operand: model.palette,
            ty: core.boolean,
        })),
        ty: core.object,
    });
    let invoke = Expr::Invoke(InvokeExpr {
        target: Box::new(lambda),
        arguments: vec![Expr::int(&universe, 1)],
        ty: core.boolean,
    });
    let block = Expr::Block(BlockExpr {
        variables: vec![x],
        expressions: vec![array, Expr::binary(BinaryOp::Add, Expr::int(&universe, 1), Expr::int(&universe, 2), core.int32)],
        ty: core.int32,
    });
    let expr = Expr::Conditional(ConditionalExpr {
        test: Box::new(invoke),
        if_true: Box::new(block),
        if_false: Box::new(Expr::int(&universe, 0)),
        ty: core.int32,
    });

    let closure = closure_of(&expr, &universe);
    for expected in [model.circle, model.shape, model.drawable, model.palette] {
        assert!(closure.contains(&expected), "missing {}", universe.full_name(expected));
    }
    assert!(!closure.contains(&circles));
}

#[rstest]
fn test_static_call_anchors_declaring_type(model: Model) {
    let core = *model.universe.core();
    let mut universe = model.universe;
    let paint = universe.find_assembly("Paint").unwrap();
    let mixer = universe.define_type(TypeDef::class("Paint.Mixing", "Mixer", paint).with_base(core.object));
    let blend = MethodRef::new("Blend", mixer, vec![model.palette, core.int32], model.palette).static_method();
    universe.add_method(mixer, blend.clone());

    let call = Expr::call(None, blend, vec![Expr::null(model.palette), Expr::int(&universe, 3)]);
    let closure = closure_of(&call, &universe);
    assert_eq!(closure, vec![mixer, model.palette, core.int32]);

    let settings = ImportSettings::from_types(&closure, &universe);
    assert_eq!(
        settings.records().cloned().collect::<Vec<_>>(),
        vec![
            ImportRecord::new("Paint", Some("Paint.Mixing")),
            ImportRecord::new("Paint", Some("Paint")),
            ImportRecord::new("System.Private.CoreLib", Some("System")),
        ]
    );
}

#[rstest]
fn test_closure_is_deterministic(model: Model) {
    let expr = Expr::binary(
        BinaryOp::Equal,
        Expr::parameter("a", model.pair_of_shape_and_palette),
        Expr::parameter("b", model.circle),
        model.universe.core().boolean,
    );
    let first = closure_of(&expr, &model.universe);
    let second = closure_of(&expr, &model.universe);
    assert_eq!(first, second);
}

#[test]
fn test_shared_defaults_are_safe_across_threads() {
    let universe = Arc::new(TypeUniverse::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let universe = Arc::clone(&universe);
            thread::spawn(move || {
                let defaults = DefaultAssemblies::shared();
                defaults.defines(&universe, universe.core().string)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
