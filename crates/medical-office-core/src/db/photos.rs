//! Patient photo and thumbnail storage.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::StoredImage;

impl Database {
    fn get_image(&self, table: &str, patient_id: i64) -> DbResult<Option<StoredImage>> {
        self.conn
            .query_row(
                &format!("SELECT content, mime_type FROM {} WHERE patient_id = ?", table),
                [patient_id],
                |row| {
                    Ok(StoredImage {
                        content: row.get(0)?,
                        mime_type: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn put_image(&self, table: &str, patient_id: i64, image: &StoredImage) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (patient_id, content, mime_type) VALUES (?1, ?2, ?3)
                 ON CONFLICT(patient_id) DO UPDATE SET content = excluded.content, mime_type = excluded.mime_type",
                table
            ),
            params![patient_id, image.content, image.mime_type],
        )?;
        Ok(())
    }

    /// Full-size photo.
    pub fn get_patient_photo(&self, patient_id: i64) -> DbResult<Option<StoredImage>> {
        self.get_image("patient_photos", patient_id)
    }

    pub fn get_patient_thumbnail(&self, patient_id: i64) -> DbResult<Option<StoredImage>> {
        self.get_image("patient_thumbnails", patient_id)
    }

    /// Store or replace both renditions.
    pub fn set_patient_photo(
        &self,
        patient_id: i64,
        photo: &StoredImage,
        thumbnail: &StoredImage,
    ) -> DbResult<()> {
        self.put_image("patient_photos", patient_id, photo)?;
        self.put_image("patient_thumbnails", patient_id, thumbnail)
    }

    /// Remove both renditions. Returns whether a photo existed.
    pub fn remove_patient_photo(&self, patient_id: i64) -> DbResult<bool> {
        let photos = self
            .conn
            .execute("DELETE FROM patient_photos WHERE patient_id = ?", [patient_id])?;
        let thumbs = self
            .conn
            .execute("DELETE FROM patient_thumbnails WHERE patient_id = ?", [patient_id])?;
        Ok(photos + thumbs > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coverage, Doctor, Patient};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let doc = db.insert_doctor(&Doctor::new("Gregory", "House")).unwrap();
        let mut p = Patient::new("Fred", "Flintstone", "9055551212", doc.id);
        p.coverage = Coverage::International;
        let p = db.insert_patient(&p).unwrap();
        (db, p.id)
    }

    #[test]
    fn test_set_replace_remove() {
        let (db, id) = setup();
        assert!(db.get_patient_photo(id).unwrap().is_none());

        let photo = StoredImage::new(vec![1, 2, 3], "image/png");
        let thumb = StoredImage::new(vec![4], "image/png");
        db.set_patient_photo(id, &photo, &thumb).unwrap();
        assert_eq!(db.get_patient_photo(id).unwrap(), Some(photo));
        assert_eq!(db.get_patient_thumbnail(id).unwrap(), Some(thumb));

        let newer = StoredImage::new(vec![9, 9], "image/png");
        db.set_patient_photo(id, &newer, &newer).unwrap();
        assert_eq!(db.get_patient_photo(id).unwrap(), Some(newer));

        assert!(db.remove_patient_photo(id).unwrap());
        assert!(!db.remove_patient_photo(id).unwrap());
        assert!(db.get_patient_thumbnail(id).unwrap().is_none());
    }

    #[test]
    fn test_photos_follow_patient_delete() {
        let (db, id) = setup();
        let img = StoredImage::new(vec![1], "image/png");
        db.set_patient_photo(id, &img, &img).unwrap();
        db.delete_patient(id).unwrap();
        assert!(db.get_patient_photo(id).unwrap().is_none());
    }
}
