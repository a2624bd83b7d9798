//! Gallery field model for the brand edit form.
//!
//! A gallery mixes images that already live on the server with files that
//! are still uploading. Items are a tagged union so the form can be
//! serialized mid-upload and the UI can render both kinds in one list.
//! Pending items carry the slot index of their upload in the
//! [`MultiUploader`](crate::MultiUploader); when that slot completes, the
//! item is resolved in place to an existing image.

use serde::{Deserialize, Serialize};

/// One entry in a brand's image gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GalleryItem {
    /// Image already stored on the server.
    #[serde(rename = "existing")]
    Existing {
        /// Database id, absent for images resolved this session.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        path: String,
    },
    /// File still uploading, keyed by its uploader slot.
    #[serde(rename = "pending", rename_all = "camelCase")]
    Pending { local_index: usize },
}

impl GalleryItem {
    pub fn is_pending(&self) -> bool {
        matches!(self, GalleryItem::Pending { .. })
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            GalleryItem::Existing { path, .. } => Some(path),
            GalleryItem::Pending { .. } => None,
        }
    }
}

/// Ordered gallery with optional primary and mascot designations.
///
/// The designations are indices into `items`. Removal keeps them pointing
/// at the same image by shifting them past the removed slot, and clears a
/// designation whose image was removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    items: Vec<GalleryItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mascot: Option<usize>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn primary(&self) -> Option<usize> {
        self.primary
    }

    pub fn mascot(&self) -> Option<usize> {
        self.mascot
    }

    /// Appends a server-side image and returns its index.
    pub fn push_existing(&mut self, id: Option<i64>, path: impl Into<String>) -> usize {
        self.items.push(GalleryItem::Existing {
            id,
            path: path.into(),
        });
        self.items.len() - 1
    }

    /// Appends a placeholder for upload slot `local_index` and returns its
    /// gallery index.
    pub fn push_pending(&mut self, local_index: usize) -> usize {
        self.items.push(GalleryItem::Pending { local_index });
        self.items.len() - 1
    }

    /// Replaces the pending item for upload slot `local_index` with the
    /// finished image at `path`. Returns `false` if no such item exists.
    pub fn resolve_pending(&mut self, local_index: usize, path: impl Into<String>) -> bool {
        for item in &mut self.items {
            if *item == (GalleryItem::Pending { local_index }) {
                *item = GalleryItem::Existing {
                    id: None,
                    path: path.into(),
                };
                return true;
            }
        }
        false
    }

    pub fn set_primary(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.primary = Some(index);
            true
        } else {
            false
        }
    }

    pub fn set_mascot(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.mascot = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear_primary(&mut self) {
        self.primary = None;
    }

    pub fn clear_mascot(&mut self) {
        self.mascot = None;
    }

    /// Removes the item at `index`, shifting the primary and mascot
    /// designations so they keep pointing at the same images.
    pub fn remove(&mut self, index: usize) -> Option<GalleryItem> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.primary = shift_after_removal(self.primary, index);
        self.mascot = shift_after_removal(self.mascot, index);
        Some(removed)
    }

    /// Server paths in gallery order. Pending items are skipped, so this
    /// is only the submittable portion of the gallery.
    pub fn paths(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|i| i.path().map(str::to_owned))
            .collect()
    }

    /// `true` once every item has a server path.
    pub fn is_settled(&self) -> bool {
        !self.items.iter().any(GalleryItem::is_pending)
    }
}

fn shift_after_removal(designation: Option<usize>, removed: usize) -> Option<usize> {
    match designation {
        Some(i) if i == removed => None,
        Some(i) if i > removed => Some(i - 1),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_serialize_with_kind_tag() {
        let existing = GalleryItem::Existing {
            id: Some(42),
            path: "/uploads/logo.png".into(),
        };
        assert_eq!(
            serde_json::to_value(&existing).unwrap(),
            json!({"kind": "existing", "id": 42, "path": "/uploads/logo.png"})
        );

        let pending = GalleryItem::Pending { local_index: 3 };
        assert_eq!(
            serde_json::to_value(&pending).unwrap(),
            json!({"kind": "pending", "localIndex": 3})
        );
    }

    #[test]
    fn resolved_items_omit_the_id() {
        let mut gallery = Gallery::new();
        gallery.push_pending(0);
        assert!(gallery.resolve_pending(0, "/uploads/new.webp"));

        let value = serde_json::to_value(gallery.items()).unwrap();
        assert_eq!(
            value,
            json!([{"kind": "existing", "path": "/uploads/new.webp"}])
        );
    }

    #[test]
    fn round_trips_through_json() {
        let mut gallery = Gallery::new();
        gallery.push_existing(Some(1), "/uploads/a.png");
        gallery.push_pending(0);
        gallery.set_primary(0);

        let text = serde_json::to_string(&gallery).unwrap();
        let back: Gallery = serde_json::from_str(&text).unwrap();
        assert_eq!(back.items(), gallery.items());
        assert_eq!(back.primary(), Some(0));
        assert_eq!(back.mascot(), None);
    }

    #[test]
    fn resolve_targets_the_matching_slot_only() {
        let mut gallery = Gallery::new();
        gallery.push_pending(0);
        gallery.push_pending(1);

        assert!(gallery.resolve_pending(1, "/uploads/second.png"));
        assert!(gallery.items()[0].is_pending());
        assert_eq!(gallery.items()[1].path(), Some("/uploads/second.png"));

        assert!(!gallery.resolve_pending(7, "/uploads/none.png"));
    }

    #[test]
    fn removal_shifts_later_designations() {
        let mut gallery = Gallery::new();
        gallery.push_existing(Some(1), "/uploads/a.png");
        gallery.push_existing(Some(2), "/uploads/b.png");
        gallery.push_existing(Some(3), "/uploads/c.png");
        gallery.set_primary(2);
        gallery.set_mascot(1);

        gallery.remove(0);
        assert_eq!(gallery.primary(), Some(1));
        assert_eq!(gallery.mascot(), Some(0));
        assert_eq!(gallery.paths(), vec!["/uploads/b.png", "/uploads/c.png"]);
    }

    #[test]
    fn removing_the_designated_image_clears_the_designation() {
        let mut gallery = Gallery::new();
        gallery.push_existing(None, "/uploads/a.png");
        gallery.push_existing(None, "/uploads/b.png");
        gallery.set_primary(1);
        gallery.set_mascot(0);

        gallery.remove(1);
        assert_eq!(gallery.primary(), None);
        assert_eq!(gallery.mascot(), Some(0));
    }

    #[test]
    fn earlier_removals_leave_earlier_designations_alone() {
        let mut gallery = Gallery::new();
        gallery.push_existing(None, "/uploads/a.png");
        gallery.push_existing(None, "/uploads/b.png");
        gallery.set_primary(0);

        gallery.remove(1);
        assert_eq!(gallery.primary(), Some(0));
    }

    #[test]
    fn settled_only_without_pending_items() {
        let mut gallery = Gallery::new();
        assert!(gallery.is_settled());

        gallery.push_existing(Some(9), "/uploads/a.png");
        gallery.push_pending(2);
        assert!(!gallery.is_settled());
        assert_eq!(gallery.paths(), vec!["/uploads/a.png"]);

        gallery.resolve_pending(2, "/uploads/done.png");
        assert!(gallery.is_settled());

        assert!(gallery.remove(5).is_none());
    }
}
