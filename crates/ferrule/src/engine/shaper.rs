use super::LiftableConstant;
use ferrule_core::{
    expr::{
        rewrite, Exception, Expr, ExprComparer, ExprHasher, Extension, Printer, Rewrite,
        SwitchCase, Type, Visit,
    },
    schema::ModelRef,
    Error, Result,
};
use std::any::Any;

/// Describes materializing an instance of a model from a row.
///
/// The materialization condition is a lambda from the row to the type
/// descriptor of the concrete model to build. It is generated from the
/// model's hierarchy: a single concrete type resolves to itself, several
/// are told apart by the discriminator column.
#[derive(Debug, Clone)]
pub struct StructuralTypeShaper {
    model: ModelRef,
    value_buffer: Expr,
    is_nullable: bool,
    condition: Expr,
}

impl StructuralTypeShaper {
    pub fn new(model: &ModelRef, value_buffer: Expr, is_nullable: bool) -> Expr {
        Expr::extension(StructuralTypeShaper {
            model: model.clone(),
            value_buffer,
            is_nullable,
            condition: materialization_condition(model),
        })
    }

    /// Replaces the materialization condition. The condition must take the
    /// row and return a type descriptor.
    pub fn with_condition(&self, condition: Expr) -> Result<Expr> {
        let well_formed = condition.as_lambda().is_some_and(|lambda| {
            lambda.params.len() == 1
                && *lambda.params[0].ty() == Type::ValueBuffer
                && *lambda.body.ty() == Type::TypeDescriptor
        });

        if !well_formed {
            return Err(Error::invalid_shape(format!(
                "materialization condition of `{}` must map a value buffer to a type descriptor; found `{}`",
                self.model.name(),
                Printer::print(&condition)
            )));
        }

        Ok(Expr::extension(StructuralTypeShaper {
            condition,
            ..self.clone()
        }))
    }

    pub fn with_value_buffer(&self, value_buffer: Expr) -> Expr {
        Expr::extension(StructuralTypeShaper {
            value_buffer,
            ..self.clone()
        })
    }

    pub fn with_nullable(&self, is_nullable: bool) -> Expr {
        Expr::extension(StructuralTypeShaper {
            is_nullable,
            ..self.clone()
        })
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn value_buffer(&self) -> &Expr {
        &self.value_buffer
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    pub fn condition(&self) -> &Expr {
        &self.condition
    }
}

/// `|value_buffer| Customer` for a single concrete type, otherwise a switch
/// over the discriminator column with a throwing default.
fn materialization_condition(model: &ModelRef) -> Expr {
    let schema = model.schema();
    let concrete = schema.concrete_types(model.id());

    Expr::lambda1("value_buffer", Type::ValueBuffer, |value_buffer| {
        if let [single] = &concrete[..] {
            return LiftableConstant::model(&schema.model_ref(single.id));
        }

        let definition = model.model();
        let discriminator = definition
            .discriminator
            .as_ref()
            .map(|discriminator| schema.field(discriminator.field));

        let value = match discriminator {
            Some(field) => Expr::read_value(value_buffer, field.storage_index, field.ty.clone()),
            None => Expr::null(Type::String),
        };

        let cases = concrete
            .iter()
            .filter_map(|concrete| {
                let discriminator_value = concrete.discriminator.as_ref()?.value.clone()?;
                Some(SwitchCase::new(
                    vec![Expr::constant(discriminator_value)],
                    LiftableConstant::model(&schema.model_ref(concrete.id)),
                ))
            })
            .collect();

        let unknown = Expr::throw(
            Exception::UnableToDiscriminate {
                entity: definition.name.clone(),
            },
            Some(value.clone()),
            Type::TypeDescriptor,
        );

        Expr::switch(Type::TypeDescriptor, value, cases, Some(unknown))
    })
}

impl Extension for StructuralTypeShaper {
    fn name(&self) -> &str {
        "structural_type_shaper"
    }

    fn ty(&self) -> Type {
        Type::Model(self.model.id())
    }

    fn visit_children(&self, visit: &mut dyn Visit) {
        visit.visit_expr(&self.value_buffer);
        visit.visit_expr(&self.condition);
    }

    fn rewrite_children(&self, r: &mut dyn Rewrite) -> Result<Option<Expr>> {
        let Some(mut children) = rewrite::rewrite_all(r, &[&self.value_buffer, &self.condition])?
        else {
            return Ok(None);
        };
        let (Some(condition), Some(value_buffer)) = (children.pop(), children.pop()) else {
            return Ok(None);
        };

        Ok(Some(Expr::extension(StructuralTypeShaper {
            model: self.model.clone(),
            value_buffer,
            is_nullable: self.is_nullable,
            condition,
        })))
    }

    fn print(&self, printer: &mut Printer) {
        printer.text("shape<");
        printer.text(self.model.name());
        if self.is_nullable {
            printer.text("?");
        }
        printer.text(">(");
        printer.expr(&self.value_buffer);
        printer.text(")");
    }

    fn eq_extension(&self, other: &dyn Extension, comparer: &mut ExprComparer) -> Result<bool> {
        let Some(other) = other.as_any().downcast_ref::<StructuralTypeShaper>() else {
            return Ok(false);
        };
        Ok(self.model == other.model
            && self.is_nullable == other.is_nullable
            && comparer.equals_expr(&self.value_buffer, &other.value_buffer)?
            && comparer.equals_expr(&self.condition, &other.condition)?)
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.model.id());
        hasher.write(&self.is_nullable);
        hasher.hash_expr(&self.value_buffer)?;
        hasher.hash_expr(&self.condition)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::ProjectionBinding, LiftContext};
    use ferrule_core::{
        expr::{Value, ValueBuffer},
        Schema,
    };
    use std::sync::Arc;

    fn animals() -> Arc<Schema> {
        let mut builder = Schema::builder();
        builder
            .model("Animal", |m| {
                m.key("Id", Type::I32)
                    .field("Name", Type::String)
                    .discriminator("Kind")
                    .abstract_model();
            })
            .model("Cat", |m| {
                m.base("Animal").discriminator_value("cat");
            })
            .model("Dog", |m| {
                m.base("Animal").discriminator_value("dog");
            });
        Arc::new(builder.build().unwrap())
    }

    fn resolve(condition: &Expr, schema: &Arc<Schema>, row: Vec<Value>) -> Result<Value> {
        let cx = LiftContext::new(schema.clone());
        let condition = crate::engine::lift::inline_constants(condition, &cx)?;
        let Value::Function(condition) = condition.eval(&cx)? else {
            panic!("condition is not a lambda");
        };
        condition.call(&cx, vec![Value::Buffer(ValueBuffer::new(row))])
    }

    #[test]
    fn single_concrete_type_resolves_to_itself() {
        let mut builder = Schema::builder();
        builder.model("Customer", |m| {
            m.key("Id", Type::I32);
        });
        let schema = Arc::new(builder.build().unwrap());
        let customer = schema.find_model_ref("Customer").unwrap();

        let shaper = StructuralTypeShaper::new(&customer, ProjectionBinding::row(), false);
        let shaper = shaper.downcast_ref::<StructuralTypeShaper>().unwrap();

        let resolved = resolve(shaper.condition(), &schema, vec![Value::I32(1)]).unwrap();
        assert_eq!(resolved, Value::Model(customer));
    }

    #[test]
    fn hierarchy_dispatches_on_discriminator() {
        let schema = animals();
        let animal = schema.find_model_ref("Animal").unwrap();
        let shaper = StructuralTypeShaper::new(&animal, ProjectionBinding::row(), false);
        let shaper = shaper.downcast_ref::<StructuralTypeShaper>().unwrap();

        let dog = resolve(
            shaper.condition(),
            &schema,
            vec![Value::I32(1), Value::from("Rex"), Value::from("dog")],
        )
        .unwrap();
        assert_eq!(dog, Value::Model(schema.find_model_ref("Dog").unwrap()));

        let err = resolve(
            shaper.condition(),
            &schema,
            vec![Value::I32(2), Value::from("Nemo"), Value::from("fish")],
        )
        .unwrap_err();
        assert!(err.is_unable_to_discriminate());
    }

    #[test]
    fn condition_override_must_match_signature() {
        let schema = animals();
        let cat = schema.find_model_ref("Cat").unwrap();
        let shaper = StructuralTypeShaper::new(&cat, ProjectionBinding::row(), false);
        let shaper = shaper.downcast_ref::<StructuralTypeShaper>().unwrap();

        let wrong = Expr::lambda1("row", Type::ValueBuffer, |_| Expr::constant("cat"));
        assert!(shaper.with_condition(wrong).unwrap_err().is_invalid_shape());

        let right = Expr::lambda1("row", Type::ValueBuffer, |_| LiftableConstant::model(&cat));
        assert!(shaper.with_condition(right).is_ok());
    }
}
