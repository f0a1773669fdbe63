//! Recursive tree listing: turns a remote folder into a flat manifest of leaf items.

use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::contract::DirectoryService;
use crate::error::DriveError;
use crate::item::PathedItem;

/// List every non-folder descendant of `folder_id`.
///
/// Children are visited depth-first in the order the service returns them.
/// Each leaf carries `base_path` joined with the names of the folders between
/// `folder_id` and the leaf, each reduced to a single path component. Folders never appear in the result. No cycle
/// detection is performed.
pub fn list_recursive<'a, S>(
    service: &'a S,
    folder_id: &'a str,
    base_path: &'a Path,
) -> BoxFuture<'a, Result<Vec<PathedItem>, DriveError>>
where
    S: DirectoryService + ?Sized,
{
    async move {
        let children = service.list_children(folder_id).await?;
        debug!(
            folder_id,
            path = %base_path.display(),
            children = children.len(),
            "Listed folder"
        );

        let mut manifest = Vec::new();
        for child in children {
            if child.is_folder() {
                let sub_path: PathBuf = base_path.join(child.local_name());
                let nested = list_recursive(service, &child.id, &sub_path).await?;
                manifest.extend(nested);
            } else {
                manifest.push(PathedItem::new(base_path, child));
            }
        }
        Ok(manifest)
    }
    .boxed()
}

/// List the whole tree under `root_id`, with paths relative to that root.
pub async fn build_manifest<S>(service: &S, root_id: &str) -> Result<Vec<PathedItem>, DriveError>
where
    S: DirectoryService + ?Sized,
{
    info!(root_id, "Listing drive tree");
    let manifest = list_recursive(service, root_id, Path::new("")).await?;
    info!(root_id, items = manifest.len(), "Drive tree listed");
    Ok(manifest)
}
