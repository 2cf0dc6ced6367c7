use super::{
    Discriminator, Field, FieldId, Model, ModelId, Navigation, Ownership, PrimaryKey, Schema,
};
use crate::{
    expr::{Type, Value},
    Result,
};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Declares models and builds a validated [`Schema`].
///
/// ```
/// # use ferrule_core::{expr::Type, Schema};
/// let schema = Schema::builder()
///     .model("Customer", |m| {
///         m.key("Id", Type::I32).field("Name", Type::String);
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.find_model("Customer").unwrap().fields.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    models: Vec<ModelBuilder>,
}

#[derive(Debug, Default)]
pub struct ModelBuilder {
    name: String,
    base: Option<String>,
    is_abstract: bool,
    fields: Vec<FieldDef>,
    key: Vec<String>,
    discriminator: Option<String>,
    discriminator_value: Option<Value>,
    owner: Option<(String, String)>,
    navigations: Vec<NavigationDef>,
}

#[derive(Debug)]
struct FieldDef {
    name: String,
    ty: Type,
    nullable: bool,
    shadow: bool,
}

#[derive(Debug)]
struct NavigationDef {
    name: String,
    target: String,
    collection: bool,
}

impl Builder {
    /// Declares a model. Base models must be declared before the models
    /// deriving from them.
    pub fn model(&mut self, name: &str, f: impl FnOnce(&mut ModelBuilder)) -> &mut Self {
        let mut model = ModelBuilder {
            name: name.to_string(),
            ..ModelBuilder::default()
        };
        f(&mut model);
        self.models.push(model);
        self
    }

    pub fn build(&self) -> Result<Schema> {
        let mut ids = IndexMap::new();
        for (index, model) in self.models.iter().enumerate() {
            if ids.insert(model.name.as_str(), ModelId(index)).is_some() {
                crate::bail!("entity type `{}` is declared twice", model.name);
            }
        }

        let resolve = |name: &str, context: &str| -> Result<ModelId> {
            ids.get(name)
                .copied()
                .ok_or_else(|| crate::err!("{context} refers to unknown entity type `{name}`"))
        };

        let mut models: Vec<Model> = Vec::with_capacity(self.models.len());
        // Next free column, per hierarchy root
        let mut columns: HashMap<ModelId, usize> = HashMap::new();

        for (index, def) in self.models.iter().enumerate() {
            let id = ModelId(index);

            let base = match &def.base {
                Some(base) => {
                    let base = resolve(base, &format!("the base of `{}`", def.name))?;
                    if base.0 >= index {
                        crate::bail!(
                            "base type of `{}` must be declared before it",
                            def.name
                        );
                    }
                    Some(base)
                }
                None => None,
            };

            let mut fields = vec![];
            let mut primary_key = None;
            let mut discriminator = None;
            let root = match base {
                Some(base) => {
                    let base = &models[base.0];
                    if !def.key.is_empty() {
                        crate::bail!(
                            "`{}` derives from `{}` and must not declare its own key",
                            def.name,
                            base.name
                        );
                    }
                    if def.discriminator.is_some() {
                        crate::bail!(
                            "`{}` derives from `{}`; only the root declares a discriminator",
                            def.name,
                            base.name
                        );
                    }

                    for field in &base.fields {
                        fields.push(Field {
                            id: FieldId {
                                model: id,
                                index: field.id.index,
                            },
                            ..field.clone()
                        });
                    }
                    primary_key = base.primary_key.as_ref().map(|pk| PrimaryKey {
                        fields: pk
                            .fields
                            .iter()
                            .map(|field| FieldId {
                                model: id,
                                index: field.index,
                            })
                            .collect(),
                    });
                    discriminator = base.discriminator.as_ref().map(|d| FieldId {
                        model: id,
                        index: d.field.index,
                    });

                    root_of(&models, base.id)
                }
                None => id,
            };

            let mut declared = HashSet::new();
            for field in &fields {
                declared.insert(field.name.clone());
            }

            let discriminator_def = def.discriminator.as_ref().map(|name| FieldDef {
                name: name.clone(),
                ty: Type::String,
                nullable: false,
                shadow: true,
            });

            for field in def.fields.iter().chain(&discriminator_def) {
                if !declared.insert(field.name.clone()) {
                    crate::bail!("`{}` declares property `{}` twice", def.name, field.name);
                }
                let next = columns.entry(root).or_default();
                let field_id = FieldId {
                    model: id,
                    index: fields.len(),
                };
                fields.push(Field {
                    id: field_id,
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                    nullable: field.nullable,
                    shadow: field.shadow,
                    storage_index: *next,
                });
                *next += 1;

                if def.discriminator.as_deref() == Some(field.name.as_str()) {
                    discriminator = Some(field_id);
                }
            }

            if base.is_none() && !def.key.is_empty() {
                let mut key = vec![];
                for name in &def.key {
                    let Some(field) = fields.iter().find(|field| &field.name == name) else {
                        crate::bail!("key of `{}` refers to unknown property `{name}`", def.name);
                    };
                    key.push(field.id);
                }
                primary_key = Some(PrimaryKey { fields: key });
            }

            let mut navigations = vec![];
            for navigation in &def.navigations {
                let target = resolve(
                    &navigation.target,
                    &format!("navigation `{}.{}`", def.name, navigation.name),
                )?;
                navigations.push(Navigation {
                    name: navigation.name.clone(),
                    target,
                    collection: navigation.collection,
                });
            }

            let owner = match &def.owner {
                Some((owner, navigation)) => Some(Ownership {
                    owner: resolve(owner, &format!("the owner of `{}`", def.name))?,
                    navigation: navigation.clone(),
                }),
                None => None,
            };

            models.push(Model {
                id,
                name: def.name.clone(),
                base,
                is_abstract: def.is_abstract,
                fields,
                navigations,
                primary_key,
                discriminator: discriminator.map(|field| Discriminator {
                    field,
                    value: def.discriminator_value.clone(),
                }),
                owner,
            });
        }

        verify_hierarchies(&models)?;
        verify_ownership(&models)?;

        Ok(Schema::from_models(models))
    }
}

fn root_of(models: &[Model], id: ModelId) -> ModelId {
    let mut current = id;
    while let Some(base) = models[current.0].base {
        current = base;
    }
    current
}

/// Every model of a hierarchy with derived types needs a discriminator, and
/// every concrete type a distinct discriminator value.
fn verify_hierarchies(models: &[Model]) -> Result<()> {
    for root in models.iter().filter(|model| model.base.is_none()) {
        let members: Vec<_> = models
            .iter()
            .filter(|model| root_of(models, model.id) == root.id)
            .collect();

        if members.len() == 1 {
            continue;
        }

        if root.discriminator.is_none() {
            crate::bail!(
                "entity type `{}` has derived types but no discriminator",
                root.name
            );
        }

        let mut seen: Vec<&Value> = vec![];
        for model in members.iter().filter(|model| !model.is_abstract) {
            let Some(value) = model.discriminator.as_ref().and_then(|d| d.value.as_ref()) else {
                crate::bail!("entity type `{}` has no discriminator value", model.name);
            };
            if seen.iter().any(|seen| seen.same_as(value)) {
                crate::bail!(
                    "discriminator value {value} of `{}` is used by another type",
                    model.name
                );
            }
            seen.push(value);
        }
    }

    Ok(())
}

fn verify_ownership(models: &[Model]) -> Result<()> {
    for model in models {
        let Some(ownership) = &model.owner else {
            continue;
        };
        let owner = &models[ownership.owner.0];
        let reaches = owner
            .navigations
            .iter()
            .any(|nav| nav.name == ownership.navigation && nav.target == model.id);
        if !reaches {
            crate::bail!(
                "owner `{}` has no navigation `{}` to owned type `{}`",
                owner.name,
                ownership.navigation,
                model.name
            );
        }
    }

    Ok(())
}

impl ModelBuilder {
    /// Adds a required property that is part of the primary key.
    pub fn key(&mut self, name: &str, ty: Type) -> &mut Self {
        self.key.push(name.to_string());
        self.push_field(name, ty, false, false)
    }

    /// Adds a shadow property that is part of the primary key.
    pub fn shadow_key(&mut self, name: &str, ty: Type) -> &mut Self {
        self.key.push(name.to_string());
        self.push_field(name, ty, false, true)
    }

    pub fn field(&mut self, name: &str, ty: Type) -> &mut Self {
        self.push_field(name, ty, false, false)
    }

    pub fn nullable(&mut self, name: &str, ty: Type) -> &mut Self {
        self.push_field(name, ty, true, false)
    }

    pub fn shadow(&mut self, name: &str, ty: Type) -> &mut Self {
        self.push_field(name, ty, true, true)
    }

    pub fn base(&mut self, name: &str) -> &mut Self {
        self.base = Some(name.to_string());
        self
    }

    pub fn abstract_model(&mut self) -> &mut Self {
        self.is_abstract = true;
        self
    }

    /// Declares the shadow column distinguishing the types of the hierarchy.
    pub fn discriminator(&mut self, name: &str) -> &mut Self {
        self.discriminator = Some(name.to_string());
        self
    }

    pub fn discriminator_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.discriminator_value = Some(value.into());
        self
    }

    pub fn owned_by(&mut self, owner: &str, navigation: &str) -> &mut Self {
        self.owner = Some((owner.to_string(), navigation.to_string()));
        self
    }

    pub fn navigation(&mut self, name: &str, target: &str) -> &mut Self {
        self.push_navigation(name, target, false)
    }

    pub fn collection(&mut self, name: &str, target: &str) -> &mut Self {
        self.push_navigation(name, target, true)
    }

    fn push_field(&mut self, name: &str, ty: Type, nullable: bool, shadow: bool) -> &mut Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            nullable,
            shadow,
        });
        self
    }

    fn push_navigation(&mut self, name: &str, target: &str, collection: bool) -> &mut Self {
        self.navigations.push(NavigationDef {
            name: name.to_string(),
            target: target.to_string(),
            collection,
        });
        self
    }
}
