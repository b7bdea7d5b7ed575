//! One delivery run: encode, persist, plan, send.

use {
    serde::Serialize,
    tracing::{info, warn},
};

use {
    pixelpost_common::SendOutcome,
    pixelpost_media::{EncodedImage, ImageStore, PixelBuffer, PngMetadata, SavedImage, encode_png},
};

use crate::{
    batch::{SendUnit, plan_units},
    client::MediaDelivery,
    config::{Grouping, SendAs},
    error::Result,
    retry::deliver_with_retry,
};

/// Inputs of one run.
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    pub images: &'a [PixelBuffer],
    pub filename_prefix: &'a str,
    pub metadata: Option<&'a PngMetadata>,
    pub send_as: SendAs,
    pub grouping: Grouping,
}

/// Outcome of one send unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDelivery {
    pub filenames: Vec<String>,
    pub outcome: SendOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    /// Every saved image in input order, whether or not it reached the chat.
    pub images: Vec<SavedImage>,
    pub deliveries: Vec<UnitDelivery>,
}

impl SendReport {
    pub fn delivered_units(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.outcome.is_delivered())
            .count()
    }

    pub fn failed_units(&self) -> usize {
        self.deliveries.len() - self.delivered_units()
    }
}

/// Save every image, then push them to Telegram unit by unit.
///
/// Encoding and storage failures abort the run. Delivery failures are
/// recorded in the report and the run moves on to the next unit.
pub async fn send_images<D, S>(
    delivery: &D,
    store: &S,
    request: &SendRequest<'_>,
) -> Result<SendReport>
where
    D: MediaDelivery + ?Sized,
    S: ImageStore + ?Sized,
{
    let Some(first) = request.images.first() else {
        info!("telegram send skipped: no images");
        return Ok(SendReport::default());
    };

    let target = store.allocate(request.filename_prefix, first.width(), first.height())?;
    let filenames = target.filenames(request.images.len())?;
    let mut encoded: Vec<EncodedImage> = Vec::with_capacity(request.images.len());
    let mut saved = Vec::with_capacity(request.images.len());

    for (buffer, filename) in request.images.iter().zip(filenames) {
        let image = encode_png(buffer, request.metadata, filename)?;
        store.persist(&target, image.filename(), image.payload())?;
        saved.push(SavedImage {
            filename: image.filename().to_string(),
            subfolder: target.subfolder.clone(),
            storage_class: store.storage_class(),
        });
        encoded.push(image);
    }

    let units = plan_units(&encoded, request.grouping);
    info!(
        images = encoded.len(),
        units = units.len(),
        send_as = ?request.send_as,
        grouping = ?request.grouping,
        "telegram send start"
    );

    let mut deliveries = Vec::with_capacity(units.len());
    for unit in units {
        let outcome = deliver_unit(delivery, unit, request.send_as).await;
        if let SendOutcome::Failed { reason } = &outcome {
            warn!(
                filenames = ?unit.filenames(),
                reason = %reason,
                "telegram unit not delivered, continuing"
            );
        }
        deliveries.push(UnitDelivery {
            filenames: unit.filenames(),
            outcome,
        });
    }

    let report = SendReport {
        images: saved,
        deliveries,
    };
    info!(
        images = report.images.len(),
        delivered_units = report.delivered_units(),
        failed_units = report.failed_units(),
        "telegram send finished"
    );
    Ok(report)
}

async fn deliver_unit<D>(delivery: &D, unit: SendUnit<'_>, send_as: SendAs) -> SendOutcome
where
    D: MediaDelivery + ?Sized,
{
    match unit {
        SendUnit::Single(image) => {
            deliver_with_retry("send single", || delivery.send_single(image, send_as)).await
        },
        SendUnit::Group(images) => {
            deliver_with_retry("send media group", || delivery.send_group(images, send_as)).await
        },
    }
}
