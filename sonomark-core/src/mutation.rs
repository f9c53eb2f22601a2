//! Bridge between engine effects and the annotation collaborator.

use std::cell::{Cell, RefCell};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::engine::{Effect, Event};
use crate::error::MutationError;
use crate::geometry::Geometry;
use crate::types::{AnnotationId, SoundEventAnnotation, Tag};

/// Persistence collaborator for annotations. Every call is asynchronous and
/// may fail; the engine never assumes success.
pub trait AnnotationStore {
    fn create(&self, geometry: Geometry, tags: Vec<Tag>) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>>;

    fn update_geometry(
        &self,
        id: AnnotationId,
        geometry: Geometry,
    ) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>>;

    fn delete(&self, id: AnnotationId) -> LocalBoxFuture<'_, Result<(), MutationError>>;

    fn add_tag(&self, id: AnnotationId, tag: Tag) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>>;

    fn remove_tag(&self, id: AnnotationId, tag: Tag) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>>;
}

/// Whether the effect goes to the collaborator rather than the viewport or
/// selection callbacks.
pub fn is_mutation(effect: &Effect) -> bool {
    matches!(
        effect,
        Effect::Create { .. }
            | Effect::UpdateGeometry { .. }
            | Effect::Copy { .. }
            | Effect::Delete { .. }
            | Effect::AddTag { .. }
            | Effect::RemoveTag { .. }
    )
}

/// Run one mutation effect against `store` and turn the outcome into the
/// event to feed back into the engine. Non-mutation effects yield `None`.
pub async fn dispatch<S: AnnotationStore + ?Sized>(store: &S, effect: Effect) -> Option<Event> {
    let outcome = match effect {
        Effect::Create { geometry, tags } | Effect::Copy { geometry, tags, .. } => {
            store.create(geometry, tags).await.map(Event::Created)
        }
        Effect::UpdateGeometry { id, geometry } => store.update_geometry(id, geometry).await.map(Event::Updated),
        Effect::Delete { id } => store.delete(id).await.map(|()| Event::Deleted(id)),
        Effect::AddTag { id, tag } => store.add_tag(id, tag).await.map(Event::Updated),
        Effect::RemoveTag { id, tag } => store.remove_tag(id, tag).await.map(Event::Updated),
        Effect::CenterOn { .. } | Effect::SetWindow(_) | Effect::Select(_) | Effect::Deselect => return None,
    };
    Some(outcome.unwrap_or_else(|e| {
        log::warn!("Annotation mutation failed: {e}");
        Event::MutationFailed(e.to_string())
    }))
}

/// In-memory collaborator. Annotations live for the lifetime of the view.
#[derive(Debug, Default)]
pub struct MemoryStore {
    annotations: RefCell<Vec<SoundEventAnnotation>>,
    next_id: Cell<u64>,
    author: Option<String>,
}

impl MemoryStore {
    pub fn new(author: Option<String>) -> Self {
        Self { author, ..Default::default() }
    }

    pub fn with_annotations(annotations: Vec<SoundEventAnnotation>) -> Self {
        let next = annotations.iter().map(|a| a.id.0 + 1).max().unwrap_or(0);
        Self { annotations: RefCell::new(annotations), next_id: Cell::new(next), author: None }
    }

    pub fn annotations(&self) -> Vec<SoundEventAnnotation> {
        self.annotations.borrow().clone()
    }

    fn checked(geometry: Geometry) -> Result<Geometry, MutationError> {
        geometry
            .ensure_persistable()
            .and_then(|()| geometry.validate())
            .map_err(|e| MutationError::Rejected(e.to_string()))
    }

    fn modify(
        &self,
        id: AnnotationId,
        change: impl FnOnce(&mut SoundEventAnnotation),
    ) -> Result<SoundEventAnnotation, MutationError> {
        let mut annotations = self.annotations.borrow_mut();
        let annotation = annotations.iter_mut().find(|a| a.id == id).ok_or(MutationError::NotFound(id))?;
        change(annotation);
        Ok(annotation.clone())
    }
}

impl AnnotationStore for MemoryStore {
    fn create(&self, geometry: Geometry, tags: Vec<Tag>) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>> {
        let result = Self::checked(geometry).map(|geometry| {
            let id = AnnotationId(self.next_id.get());
            self.next_id.set(id.0 + 1);
            let annotation = SoundEventAnnotation {
                id,
                geometry,
                tags,
                features: Vec::new(),
                created_by: self.author.clone(),
            };
            self.annotations.borrow_mut().push(annotation.clone());
            annotation
        });
        async move { result }.boxed_local()
    }

    fn update_geometry(
        &self,
        id: AnnotationId,
        geometry: Geometry,
    ) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>> {
        let result = Self::checked(geometry).and_then(|geometry| self.modify(id, |a| a.geometry = geometry));
        async move { result }.boxed_local()
    }

    fn delete(&self, id: AnnotationId) -> LocalBoxFuture<'_, Result<(), MutationError>> {
        let mut annotations = self.annotations.borrow_mut();
        let before = annotations.len();
        annotations.retain(|a| a.id != id);
        let result = if annotations.len() < before { Ok(()) } else { Err(MutationError::NotFound(id)) };
        async move { result }.boxed_local()
    }

    fn add_tag(&self, id: AnnotationId, tag: Tag) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>> {
        let result = self.modify(id, |a| {
            if !a.tags.contains(&tag) {
                a.tags.push(tag);
            }
        });
        async move { result }.boxed_local()
    }

    fn remove_tag(&self, id: AnnotationId, tag: Tag) -> LocalBoxFuture<'_, Result<SoundEventAnnotation, MutationError>> {
        let result = self.modify(id, |a| a.tags.retain(|t| *t != tag));
        async move { result }.boxed_local()
    }
}
