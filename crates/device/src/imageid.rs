//! Backfill of the `ImageId` column, which the firmware needs to find the
//! cover images of sideloaded books.

use crate::db::DeviceDatabase;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::collections::HashSet;
use tracing::instrument;

/// `ContentType` of top-level book rows.
pub const CONTENT_TYPE_BOOK: i64 = 6;
/// Updates applied per transaction.
pub const BATCH_SIZE: usize = 100;

/// A book as listed on the device by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBook {
    pub content_id: String,
    /// Host library id. Books without one are not managed by the host.
    pub application_id: Option<i64>,
}

/// Derive the `ImageId` the firmware expects for `content_id`.
pub fn image_id(content_id: &str) -> String {
    content_id.replace(['/', ' ', ':', '.'], "_")
}

/// Outcome of one [`reconcile`] pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
    /// Book rows lacking an `ImageId`.
    pub found: usize,
    /// Updates queued for books present in the booklists.
    pub queued: usize,
    /// Size of each applied batch, in order.
    pub batches: Vec<usize>,
}

/// Assign an `ImageId` to every listed book whose row lacks one.
///
/// Updates are applied in transactions of [`BATCH_SIZE`]. A failure aborts
/// the pass; batches already committed stay committed.
#[instrument(skip_all, fields(booklists = booklists.len()))]
pub async fn reconcile(db: &DeviceDatabase, booklists: &[Vec<DeviceBook>]) -> Result<Report> {
    let missing: HashSet<String> = sqlx::query_scalar::<_, String>(include_str!("../queries/rows_missing_image_id.sql"))
        .bind(CONTENT_TYPE_BOOK)
        .fetch_all(db.pool())
        .await
        .or_raise(|| ErrorKind::Database)?
        .into_iter()
        .collect();
    tracing::debug!(rows = missing.len(), "Rows needing an ImageId");

    let queue: Vec<(String, &str)> = booklists
        .iter()
        .flatten()
        .filter(|book| book.application_id.is_some() && missing.contains(&book.content_id))
        .map(|book| (image_id(&book.content_id), book.content_id.as_str()))
        .collect();
    let mut report = Report { found: missing.len(), queued: queue.len(), batches: Vec::new() };

    for batch in queue.chunks(BATCH_SIZE) {
        tracing::debug!(size = batch.len(), "Updating ImageIds");
        let mut tx = db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        for (image_id, content_id) in batch {
            sqlx::query(include_str!("../queries/set_image_id.sql"))
                .bind(image_id)
                .bind(*content_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        report.batches.push(batch.len());
    }
    tracing::info!(updated = report.queued, "Done setting ImageId fields");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn device_db(rows: &[(&str, i64, Option<&str>)]) -> DeviceDatabase {
        let db = DeviceDatabase::connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE content (ContentID TEXT PRIMARY KEY, ContentType INTEGER, ImageId TEXT)")
            .execute(db.pool())
            .await
            .unwrap();
        for (content_id, content_type, image_id) in rows {
            sqlx::query("INSERT INTO content (ContentID, ContentType, ImageId) VALUES (?, ?, ?)")
                .bind(*content_id)
                .bind(*content_type)
                .bind(*image_id)
                .execute(db.pool())
                .await
                .unwrap();
        }
        db
    }

    async fn image_id_of(db: &DeviceDatabase, content_id: &str) -> Option<String> {
        sqlx::query_scalar::<_, Option<String>>("SELECT ImageId FROM content WHERE ContentID = ?")
            .bind(content_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    fn listed(content_id: &str) -> DeviceBook {
        DeviceBook { content_id: content_id.to_string(), application_id: Some(1) }
    }

    #[rstest]
    #[case("file:///mnt/onboard/Book.kepub.epub", "file____mnt_onboard_Book_kepub_epub")]
    #[case("/mnt/sd/My Book.epub", "_mnt_sd_My_Book_epub")]
    #[case("plain", "plain")]
    fn derives_image_ids(#[case] content_id: &str, #[case] expected: &str) {
        assert_eq!(image_id(content_id), expected);
    }

    #[tokio::test]
    async fn fills_only_missing_book_rows() {
        let db = device_db(&[
            ("/a.epub", 6, None),
            ("/b.epub", 6, Some("")),
            ("/c.epub", 6, Some("keep")),
            ("/d.epub", 9, None),
            ("/e.epub", 6, None),
        ])
        .await;
        let booklists = vec![
            vec![listed("/a.epub"), listed("/c.epub"), listed("/d.epub")],
            vec![listed("/b.epub"), DeviceBook { content_id: "/e.epub".into(), application_id: None }],
        ];
        let report = reconcile(&db, &booklists).await.unwrap();
        assert_eq!(report, Report { found: 3, queued: 2, batches: vec![2] });
        assert_eq!(image_id_of(&db, "/a.epub").await.as_deref(), Some("_a_epub"));
        assert_eq!(image_id_of(&db, "/b.epub").await.as_deref(), Some("_b_epub"));
        assert_eq!(image_id_of(&db, "/c.epub").await.as_deref(), Some("keep"));
        assert_eq!(image_id_of(&db, "/d.epub").await, None);
        assert_eq!(image_id_of(&db, "/e.epub").await, None);
        db.close().await;
    }

    #[tokio::test]
    async fn applies_updates_in_batches_of_one_hundred() {
        let ids: Vec<String> = (0..250).map(|i| format!("/mnt/onboard/book{i:03}.epub")).collect();
        let rows: Vec<(&str, i64, Option<&str>)> = ids.iter().map(|id| (id.as_str(), 6, None)).collect();
        let db = device_db(&rows).await;
        let booklists = vec![ids.iter().map(String::as_str).map(listed).collect::<Vec<_>>()];

        let report = reconcile(&db, &booklists).await.unwrap();
        assert_eq!(report.found, 250);
        assert_eq!(report.queued, 250);
        assert_eq!(report.batches, vec![100, 100, 50]);

        // Nothing is left for a second pass.
        let again = reconcile(&db, &booklists).await.unwrap();
        assert_eq!(again, Report::default());
        db.close().await;
    }

    #[tokio::test]
    async fn empty_booklists_touch_nothing() {
        let db = device_db(&[("/a.epub", 6, None)]).await;
        let report = reconcile(&db, &[]).await.unwrap();
        assert_eq!(report, Report { found: 1, queued: 0, batches: vec![] });
        db.close().await;
    }

    #[tokio::test]
    async fn missing_table_is_a_database_error() {
        let db = DeviceDatabase::connect_in_memory().await.unwrap();
        let err = reconcile(&db, &[vec![listed("/a.epub")]]).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
    }
}
