//! Medicine CRUD operations.

use tracing::{debug, info};

use super::{MedicineStore, StoreError, StoreResult};
use crate::models::{MedicineId, MedicineInput, MedicineRecord};

impl MedicineStore {
    /// Id the next added medicine will receive: max existing id + 1.
    ///
    /// Ids freed by deleting the highest record are handed out again.
    pub fn next_id(&self) -> MedicineId {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Add a medicine, returning its assigned id.
    pub fn add(&mut self, input: MedicineInput) -> StoreResult<MedicineId> {
        input.validate()?;
        self.refresh();

        let id = self.next_id();
        let record = MedicineRecord::from_input(id, input);

        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)?;

        info!(id, "Medicine added");
        Ok(id)
    }

    /// Overwrite a medicine's editable fields.
    ///
    /// `id` and `created_at` are kept from the original, `updated_at` is stamped.
    pub fn edit(&mut self, id: MedicineId, input: MedicineInput) -> StoreResult<()> {
        input.validate()?;
        self.refresh();

        let mut next = self.records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.apply_input(input);
        self.commit(next)?;

        info!(id, "Medicine updated");
        Ok(())
    }

    /// Delete the first medicine with `id`, returning it.
    pub fn delete(&mut self, id: MedicineId) -> StoreResult<MedicineRecord> {
        self.refresh();
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let mut next = self.records.clone();
        let removed = next.remove(position);
        self.commit(next)?;

        info!(id, name = %removed.name, "Medicine deleted");
        Ok(removed)
    }

    /// Get a medicine by id.
    pub fn get_by_id(&self, id: MedicineId) -> Option<&MedicineRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Get the first medicine whose display string ("name - dose") matches.
    pub fn find_by_display(&self, display: &str) -> Option<&MedicineRecord> {
        self.records.iter().find(|r| r.display_name() == display)
    }

    /// Total number of medicines.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Case-insensitive substring search over names.
    pub fn search(&self, query: &str) -> Vec<&MedicineRecord> {
        let query = query.trim().to_lowercase();
        let matches: Vec<&MedicineRecord> = self
            .records
            .iter()
            .filter(|r| query.is_empty() || r.name.to_lowercase().contains(&query))
            .collect();
        debug!(query = %query, hits = matches.len(), "Searched medicines");
        matches
    }
}
