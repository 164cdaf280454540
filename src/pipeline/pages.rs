//! Parallel page processing: OCR + numeric filtering across a worker pool.
//!
//! Each page runs recognition on Tokio's blocking pool (the engine call is a
//! CPU-bound subprocess). At most `workers` pages are in flight at once, and
//! [`StreamExt::buffered`] yields results in submission order, so the
//! flattened output is identical to a sequential pass whatever the timing.

use crate::error::PageError;
use crate::pipeline::extract::CoordinateFilter;
use crate::pipeline::recognize::TextRecognizer;
use crate::pipeline::render::RasterPage;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognise and filter every page, returning all qualifying values in
/// page order.
///
/// A page whose recognition fails contributes no values; the error is
/// logged and the remaining pages are unaffected.
pub async fn process_pages(
    pages: Vec<RasterPage>,
    recognizer: &Arc<dyn TextRecognizer>,
    filter: CoordinateFilter,
    workers: usize,
) -> Vec<f64> {
    let total = pages.len();

    let per_page: Vec<Vec<f64>> = stream::iter(pages.into_iter().map(|page| {
        let recognizer = Arc::clone(recognizer);
        async move {
            let page_num = page.page_num;
            match recognize_page(recognizer, page, filter).await {
                Ok(values) => {
                    debug!(
                        "Page {}/{}: {} candidate values",
                        page_num,
                        total,
                        values.len()
                    );
                    values
                }
                Err(e) => {
                    warn!("{}; page contributes no values", e);
                    Vec::new()
                }
            }
        }
    }))
    .buffered(workers.max(1))
    .collect()
    .await;

    per_page.into_iter().flatten().collect()
}

/// Run one page through the recognizer and the filter on the blocking pool.
async fn recognize_page(
    recognizer: Arc<dyn TextRecognizer>,
    page: RasterPage,
    filter: CoordinateFilter,
) -> Result<Vec<f64>, PageError> {
    let page_num = page.page_num;

    tokio::task::spawn_blocking(move || -> Result<Vec<f64>, PageError> {
        let tokens = recognizer.recognize(&page)?;
        Ok(filter.extract(&tokens))
    })
    .await
    .map_err(|e| PageError::WorkerPanicked {
        page: page_num,
        detail: e.to_string(),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn page(n: usize) -> RasterPage {
        RasterPage {
            page_num: n,
            source: PathBuf::from("plan.pdf"),
            image: DynamicImage::ImageRgba8(RgbaImage::new(1, 1)),
        }
    }

    /// Emits `100000 + page*10 + k` tokens; earlier pages sleep longer so
    /// completion order is the reverse of page order.
    struct SlowFirstRecognizer {
        pages: usize,
        calls: AtomicUsize,
    }

    impl TextRecognizer for SlowFirstRecognizer {
        fn recognize(&self, page: &RasterPage) -> Result<Vec<String>, PageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = (self.pages - page.page_num) as u64 * 15;
            std::thread::sleep(Duration::from_millis(delay));
            Ok((0..3)
                .map(|k| (100_000 + page.page_num * 10 + k).to_string())
                .collect())
        }
    }

    struct FailingPageRecognizer {
        bad_page: usize,
    }

    impl TextRecognizer for FailingPageRecognizer {
        fn recognize(&self, page: &RasterPage) -> Result<Vec<String>, PageError> {
            if page.page_num == self.bad_page {
                return Err(PageError::RecognitionFailed {
                    page: page.page_num,
                    detail: "engine crashed".into(),
                });
            }
            Ok(vec![format!("{}", 200_000 + page.page_num)])
        }
    }

    struct PanickingRecognizer;

    impl TextRecognizer for PanickingRecognizer {
        fn recognize(&self, page: &RasterPage) -> Result<Vec<String>, PageError> {
            if page.page_num == 1 {
                panic!("worker blew up");
            }
            Ok(vec!["300002".into()])
        }
    }

    #[tokio::test]
    async fn parallel_output_matches_sequential_order() {
        let n = 6;
        let rec: Arc<dyn TextRecognizer> = Arc::new(SlowFirstRecognizer {
            pages: n,
            calls: AtomicUsize::new(0),
        });
        let pages: Vec<_> = (1..=n).map(page).collect();

        let parallel = process_pages(pages.clone(), &rec, CoordinateFilter::default(), 4).await;
        let sequential = process_pages(pages, &rec, CoordinateFilter::default(), 1).await;

        let expected: Vec<f64> = (1..=n)
            .flat_map(|p| (0..3).map(move |k| (100_000 + p * 10 + k) as f64))
            .collect();
        assert_eq!(parallel, expected);
        assert_eq!(sequential, expected);
    }

    #[tokio::test]
    async fn failed_page_contributes_nothing() {
        let rec: Arc<dyn TextRecognizer> = Arc::new(FailingPageRecognizer { bad_page: 2 });
        let pages: Vec<_> = (1..=3).map(page).collect();
        let values = process_pages(pages, &rec, CoordinateFilter::default(), 2).await;
        assert_eq!(values, vec![200_001.0, 200_003.0]);
    }

    #[tokio::test]
    async fn panicking_worker_is_contained() {
        let rec: Arc<dyn TextRecognizer> = Arc::new(PanickingRecognizer);
        let values = process_pages(vec![page(1), page(2)], &rec, CoordinateFilter::default(), 2).await;
        assert_eq!(values, vec![300_002.0]);
    }

    #[tokio::test]
    async fn no_pages_no_values() {
        let rec: Arc<dyn TextRecognizer> = Arc::new(FailingPageRecognizer { bad_page: 0 });
        assert!(process_pages(Vec::new(), &rec, CoordinateFilter::default(), 3)
            .await
            .is_empty());
    }
}
