//! Face list cache for one shell session.

use facereg_core::FaceRecord;

/// Faces as last fetched from the service. Replaced wholesale on every
/// fetch, never patched locally.
#[derive(Debug, Default)]
pub struct AppState {
    all_faces: Vec<FaceRecord>,
    /// Search hits. Empty means "show `all_faces`".
    filtered_faces: Vec<FaceRecord>,
}

impl AppState {
    /// Result of an unfiltered load; drops any search filter.
    pub fn replace_all(&mut self, faces: Vec<FaceRecord>) {
        self.all_faces = faces;
        self.filtered_faces.clear();
    }

    pub fn set_filtered(&mut self, faces: Vec<FaceRecord>) {
        self.filtered_faces = faces;
    }

    pub fn clear(&mut self) {
        self.all_faces.clear();
        self.filtered_faces.clear();
    }

    pub fn all_faces(&self) -> &[FaceRecord] {
        &self.all_faces
    }

    #[cfg(test)]
    pub fn filtered_faces(&self) -> &[FaceRecord] {
        &self.filtered_faces
    }

    /// The set being displayed.
    pub fn active(&self) -> &[FaceRecord] {
        if self.filtered_faces.is_empty() {
            &self.all_faces
        } else {
            &self.filtered_faces
        }
    }

    pub fn is_filtered(&self) -> bool {
        !self.filtered_faces.is_empty()
    }
}
