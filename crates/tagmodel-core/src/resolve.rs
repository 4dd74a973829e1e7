//! Model resolution.
//!
//! Resolution runs in two phases per model. Phase 1 builds a skeleton for
//! every exported field (ignored flag, primary key, default, auto increment,
//! column name). Phase 2 walks the skeletons in order and classifies each
//! declared type: plain columns, scanners and timestamps become normal
//! columns, struct and sequence-of-struct fields go through relationship
//! resolution or embedding.
//!
//! Associated models are resolved inside the same pass. A model that is
//! already on the resolution stack (self or mutual references) is looked up
//! through its skeletons. Foreign-key marks on finished or cached models are
//! collected as [`FieldPatch`]es and applied in place when the pass is
//! published, so every holder of a cached model sees the same instance.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ModelCache;
use crate::field::{FieldMetadata, TypeClass};
use crate::join_table::JoinTableHandler;
use crate::model::{ModelMetadata, ModelType, UnresolvedRelationship};
use crate::naming::{default_table_name, pluralize, to_db_name};
use crate::reflect::{ModelDescriptor, ModelRef};
use crate::relationship::{RelationshipKind, RelationshipMetadata};
use crate::tag::TagSettings;

/// Foreign-key mark on a field of a finished or cached model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPatch {
    /// Model owning the field.
    pub model: TypeId,
    /// Index into the model's fields.
    pub field: usize,
}

/// A model whose phase 2 is running.
struct Frame {
    model_type: ModelType,
    fields: Vec<FieldMetadata>,
    anonymous: Vec<bool>,
}

/// Where the fields of an associated model can be read.
enum Source {
    Frame(usize),
    Finished(usize),
    Cached(Arc<ModelMetadata>),
}

/// A primary key found during phase 2, before final positions are known.
enum PrimaryRef {
    Direct(usize),
    Embedded { field: usize, offset: usize },
}

/// One resolution pass over a model and everything it reaches.
pub(crate) struct Resolution<'c> {
    cache: &'c ModelCache,
    frames: Vec<Frame>,
    finished: Vec<ModelMetadata>,
    patches: Vec<FieldPatch>,
}

impl<'c> Resolution<'c> {
    pub(crate) fn new(cache: &'c ModelCache) -> Self {
        Self {
            cache,
            frames: Vec::new(),
            finished: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Resolve `descriptor` and return its index in the finished list.
    pub(crate) fn resolve(
        &mut self,
        descriptor: &ModelDescriptor,
        instance_table_name: Option<String>,
    ) -> usize {
        let model_type = ModelType::from(descriptor);
        if !descriptor.is_struct() {
            tracing::debug!(model = model_type.name(), "Not a struct; empty metadata");
            self.finished.push(ModelMetadata::empty(model_type));
            return self.finished.len() - 1;
        }

        let table_name = instance_table_name
            .or_else(|| descriptor.table_name.clone())
            .unwrap_or_else(|| {
                default_table_name(descriptor.name, self.cache.config().singular_table)
            });

        // Phase 1: skeletons for every exported field.
        let exported = descriptor.fields.iter().filter(|f| f.exported);
        let mut fields = Vec::new();
        let mut anonymous = Vec::new();
        let mut primary = Vec::new();
        for (idx, declared) in exported.enumerate() {
            let field = FieldMetadata::from_descriptor(declared);
            if field.is_primary_key {
                primary.push(PrimaryRef::Direct(idx));
            }
            fields.push(field);
            anonymous.push(declared.anonymous);
        }

        self.frames.push(Frame {
            model_type,
            fields,
            anonymous,
        });
        let depth = self.frames.len() - 1;

        // Phase 2: classification and relationships.
        let mut expansions: HashMap<usize, Vec<FieldMetadata>> = HashMap::new();
        let mut unresolved = Vec::new();
        for idx in 0..self.frames[depth].fields.len() {
            if self.frames[depth].fields[idx].is_ignored {
                continue;
            }

            match self.frames[depth].fields[idx].type_class() {
                TypeClass::Column { scanner } => {
                    let field = &mut self.frames[depth].fields[idx];
                    field.is_normal = true;
                    field.is_scanner = scanner;
                }
                TypeClass::StructSequence(model) => {
                    self.resolve_sequence(depth, idx, model, &mut unresolved);
                }
                TypeClass::Struct(model) => {
                    if let Some(embedded) = self.resolve_struct(depth, idx, model, &mut unresolved)
                    {
                        for (offset, field) in embedded.iter().enumerate() {
                            if field.is_primary_key {
                                primary.push(PrimaryRef::Embedded { field: idx, offset });
                            }
                        }
                        expansions.insert(idx, embedded);
                        continue;
                    }
                }
            }

            let field = &mut self.frames[depth].fields[idx];
            if field.is_normal && primary.is_empty() && field.column_name == "id" {
                field.is_primary_key = true;
                primary.push(PrimaryRef::Direct(idx));
            }
        }

        let frame = self.frames.remove(depth);

        // Expand embedded fields in place of the embedding field.
        let mut positions = vec![None; frame.fields.len()];
        let mut embedded_starts = HashMap::new();
        let mut resolved = Vec::with_capacity(frame.fields.len());
        for (idx, field) in frame.fields.into_iter().enumerate() {
            if let Some(embedded) = expansions.remove(&idx) {
                embedded_starts.insert(idx, resolved.len());
                resolved.extend(embedded);
            } else {
                positions[idx] = Some(resolved.len());
                resolved.push(field);
            }
        }
        let primary_field_indices = primary
            .iter()
            .filter_map(|p| match *p {
                PrimaryRef::Direct(idx) => positions[idx],
                PrimaryRef::Embedded { field, offset } => {
                    embedded_starts.get(&field).map(|start| start + offset)
                }
            })
            .collect();

        tracing::debug!(
            model = model_type.name(),
            table = %table_name,
            fields = resolved.len(),
            unresolved = unresolved.len(),
            "Resolved model metadata"
        );

        self.finished.push(ModelMetadata::new(
            model_type,
            table_name,
            resolved,
            primary_field_indices,
            unresolved,
        ));
        self.finished.len() - 1
    }

    /// has_many or many_to_many.
    fn resolve_sequence(
        &mut self,
        depth: usize,
        idx: usize,
        model: ModelRef,
        unresolved: &mut Vec<UnresolvedRelationship>,
    ) {
        let source = self.source(&model);
        if !self.is_struct(&source) {
            self.frames[depth].fields[idx].is_normal = true;
            return;
        }

        let owner = self.frames[depth].model_type;
        let settings = self.frames[depth].fields[idx].settings.clone();
        let mut rel = self.polymorphic(&source, &settings);

        let foreign_key = settings
            .get_non_empty("FOREIGNKEY")
            .map_or_else(|| format!("{}Id", owner.name()), str::to_string);

        if let Some(join) = settings.get("MANY2MANY") {
            let association_foreign_key = settings
                .get_non_empty("ASSOCIATIONFOREIGNKEY")
                .map_or_else(|| format!("{}Id", model.name()), str::to_string);

            rel.kind = RelationshipKind::ManyToMany;
            rel.foreign_column_name = to_db_name(&foreign_key);
            rel.foreign_field_name = foreign_key;
            rel.association_foreign_column_name = Some(to_db_name(&association_foreign_key));
            rel.association_foreign_field_name = Some(association_foreign_key);

            let table_name = join_table_name(join, owner, &model);
            let handler = JoinTableHandler::new(
                table_name,
                owner,
                (
                    rel.foreign_column_name.clone(),
                    self.primary_column(&Source::Frame(depth)),
                ),
                ModelType::from(&model),
                (
                    rel.association_foreign_column_name.clone().unwrap_or_default(),
                    self.primary_column(&source),
                ),
            );
            rel.join_table = Some(handler);
            self.attach(depth, idx, rel);
            return;
        }

        rel.kind = RelationshipKind::HasMany;
        if let Some(found) = self.find(&source, &foreign_key) {
            self.take_foreign_key(&source, found, &mut rel);
            self.attach(depth, idx, rel);
        } else if rel.has_foreign_key() {
            self.attach(depth, idx, rel);
        } else {
            self.omit(depth, idx, foreign_key, unresolved);
        }
    }

    /// Embedding, belongs_to or has_one. Returns the flattened fields when the
    /// field is an embedding.
    fn resolve_struct(
        &mut self,
        depth: usize,
        idx: usize,
        model: ModelRef,
        unresolved: &mut Vec<UnresolvedRelationship>,
    ) -> Option<Vec<FieldMetadata>> {
        let source = self.source(&model);
        if !self.is_struct(&source) {
            self.frames[depth].fields[idx].is_normal = true;
            return None;
        }

        let owner = self.frames[depth].model_type;
        let field_name = self.frames[depth].fields[idx].name.clone();
        let settings = self.frames[depth].fields[idx].settings.clone();
        let mut rel = self.polymorphic(&source, &settings);

        if settings.contains("EMBEDDED") || self.frames[depth].anonymous[idx] {
            let embedded = self
                .fields_of(&source)
                .iter()
                .map(|f| f.embedded_in(&field_name))
                .collect();
            return Some(embedded);
        }

        let explicit = settings.get_non_empty("FOREIGNKEY").map(str::to_string);

        let own = Source::Frame(depth);
        let belongs_to_key = explicit
            .clone()
            .unwrap_or_else(|| format!("{field_name}Id"));
        if let Some(found) = self.find(&own, &belongs_to_key) {
            rel.kind = RelationshipKind::BelongsTo;
            self.take_foreign_key(&own, found, &mut rel);
            self.attach(depth, idx, rel);
            return None;
        }

        let has_one_key = explicit.unwrap_or_else(|| format!("{}Id", owner.name()));
        rel.kind = RelationshipKind::HasOne;
        if let Some(found) = self.find(&source, &has_one_key) {
            self.take_foreign_key(&source, found, &mut rel);
            self.attach(depth, idx, rel);
        } else if rel.has_foreign_key() {
            self.attach(depth, idx, rel);
        } else {
            self.omit(depth, idx, has_one_key, unresolved);
        }
        None
    }

    /// Start a relationship, filling in polymorphic keys when both the id and
    /// type fields exist on the associated model.
    fn polymorphic(&mut self, source: &Source, settings: &TagSettings) -> RelationshipMetadata {
        let mut rel = RelationshipMetadata::new(RelationshipKind::HasOne);
        let Some(polymorphic) = settings.get_non_empty("POLYMORPHIC") else {
            return rel;
        };

        let id_field = self.find(source, &format!("{polymorphic}Id"));
        let type_field = self.find(source, &format!("{polymorphic}Type"));
        if let (Some(id_idx), Some(type_idx)) = (id_field, type_field) {
            let fields = self.fields_of(source);
            rel = rel
                .foreign_key(
                    fields[id_idx].name.clone(),
                    fields[id_idx].column_name.clone(),
                )
                .polymorphic_type(
                    fields[type_idx].name.clone(),
                    fields[type_idx].column_name.clone(),
                );
            self.mark_foreign_key(source, type_idx);
            self.mark_foreign_key(source, id_idx);
        }
        rel
    }

    fn take_foreign_key(&mut self, source: &Source, idx: usize, rel: &mut RelationshipMetadata) {
        let field = &self.fields_of(source)[idx];
        rel.foreign_field_name = field.name.clone();
        rel.foreign_column_name = field.column_name.clone();
        self.mark_foreign_key(source, idx);
    }

    fn attach(&mut self, depth: usize, idx: usize, rel: RelationshipMetadata) {
        let frame = &mut self.frames[depth];
        tracing::trace!(
            model = frame.model_type.name(),
            field = %frame.fields[idx].name,
            kind = %rel.kind,
            foreign_key = %rel.foreign_field_name,
            "Attached relationship"
        );
        frame.fields[idx].relationship = Some(rel);
    }

    fn omit(
        &mut self,
        depth: usize,
        idx: usize,
        foreign_key: String,
        unresolved: &mut Vec<UnresolvedRelationship>,
    ) {
        let frame = &self.frames[depth];
        let field = frame.fields[idx].name.clone();
        tracing::debug!(
            model = frame.model_type.name(),
            field = %field,
            foreign_key = %foreign_key,
            "No foreign key found; relationship omitted"
        );
        unresolved.push(UnresolvedRelationship { field, foreign_key });
    }

    /// Locate the fields of `model`, resolving it if nothing has seen it yet.
    fn source(&mut self, model: &ModelRef) -> Source {
        if let Some(idx) = self
            .frames
            .iter()
            .rposition(|f| f.model_type.id() == model.id())
        {
            return Source::Frame(idx);
        }
        if let Some(idx) = self
            .finished
            .iter()
            .position(|m| m.model_type.id() == model.id())
        {
            return Source::Finished(idx);
        }
        if let Some(cached) = self.cache.lookup(model.id()) {
            return Source::Cached(cached);
        }
        Source::Finished(self.resolve(&model.describe(), None))
    }

    fn fields_of<'a>(&'a self, source: &'a Source) -> &'a [FieldMetadata] {
        match source {
            Source::Frame(idx) => &self.frames[*idx].fields,
            Source::Finished(idx) => &self.finished[*idx].fields,
            Source::Cached(meta) => &meta.fields,
        }
    }

    fn is_struct(&self, source: &Source) -> bool {
        match source {
            Source::Frame(_) => true,
            Source::Finished(idx) => self.finished[*idx].is_struct(),
            Source::Cached(meta) => meta.is_struct(),
        }
    }

    /// First field matching `key` by name or column.
    fn find(&self, source: &Source, key: &str) -> Option<usize> {
        self.fields_of(source).iter().position(|f| f.matches(key))
    }

    /// Column the join table references on `source`.
    fn primary_column(&self, source: &Source) -> String {
        let fields = self.fields_of(source);
        let primary = match source {
            Source::Frame(_) => fields.iter().find(|f| f.is_primary_key),
            Source::Finished(idx) => self.finished[*idx].primary_fields().next(),
            Source::Cached(meta) => meta.primary_fields().next(),
        };
        primary
            .or_else(|| fields.iter().find(|f| f.column_name == "id"))
            .map_or_else(|| "id".to_string(), |f| f.column_name.clone())
    }

    fn mark_foreign_key(&mut self, source: &Source, idx: usize) {
        match source {
            Source::Frame(depth) => self.frames[*depth].fields[idx].mark_foreign_key(),
            Source::Finished(pos) => {
                let meta = &self.finished[*pos];
                meta.fields[idx].mark_foreign_key();
                self.patches.push(FieldPatch {
                    model: meta.model_type.id(),
                    field: idx,
                });
            }
            Source::Cached(meta) => self.patches.push(FieldPatch {
                model: meta.model_type.id(),
                field: idx,
            }),
        }
    }

    /// Hand every model finished in this pass, and every patch, to the cache.
    pub(crate) fn publish(mut self, root: usize) -> Arc<ModelMetadata> {
        let root_meta = self.finished.swap_remove(root);
        self.cache
            .publish(root_meta, self.finished, &self.patches)
    }
}

/// Join table name from a `MANY2MANY` setting; a bare marker derives one from
/// both model names.
fn join_table_name(setting: &str, owner: ModelType, associated: &ModelRef) -> String {
    if !setting.is_empty() && setting != "MANY2MANY" {
        return setting.to_string();
    }
    format!(
        "{}_{}",
        to_db_name(owner.name()),
        pluralize(&to_db_name(associated.name()))
    )
}
