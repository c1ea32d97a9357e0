use tracing::{debug, info, warn};

use crate::context::Context;
use crate::crypto::EncryptionKey;
use crate::error::Result;
use crate::fragment::{Fragment, FragmentDescriptor, FragmentId};
use crate::store::FragmentStore;
use crate::view;

/// Merge every metadata fragment of the array into one.
///
/// Steps:
/// 1. Verify the key against the array header
/// 2. List and decode all fragments (unbounded read timestamp)
/// 3. Replay them with the same merge used by read sessions
/// 4. Write the live entries, in iteration order, as one fragment spanning
///    `[min start_ts, max end_ts]` with `seq = max input seq`
/// 5. Delete the inputs
///
/// CRITICAL INVARIANT: the new fragment is durable before any input is
/// removed. A failure in 1-4 leaves the array untouched; a failure in 5
/// leaves redundant fragments that merge to the same state and are picked
/// up by the next consolidation.
///
/// Must not run concurrently with another consolidation of the same array.
/// Fragments committed after the listing in step 2 are left alone.
pub fn consolidate(
    ctx: &Context,
    uri: &str,
    key: Option<&EncryptionKey>,
) -> Result<Option<FragmentDescriptor>> {
    let store = FragmentStore::new(ctx, uri);
    store.header()?.verify_key(key)?;

    let inputs = store.list()?;
    if inputs.len() < 2 {
        debug!(
            "consolidation of {} skipped: {} fragment(s)",
            store.array_uri(),
            inputs.len()
        );
        return Ok(None);
    }

    // Every input must decode with this key before anything is written
    let fragments = store.load_all(&inputs, key)?;
    let merged = consolidate_fragments(&fragments);
    let output = store.write(&merged, key)?;

    let mut failed = 0usize;
    for desc in &inputs {
        if let Err(e) = store.delete(desc) {
            warn!("failed to remove consolidated fragment {}: {}", desc.name, e);
            failed += 1;
        }
    }

    info!(
        "consolidated {} metadata fragments of {} into {} ({} live items, {} left behind)",
        inputs.len(),
        store.array_uri(),
        output.name,
        merged.entries.len(),
        failed
    );
    Ok(Some(output))
}

/// Build the consolidated fragment for a replay-ordered set of inputs.
///
/// The result's entries are the live view as puts, so replaying it alone
/// yields the same keys, values and order as replaying all inputs.
pub fn consolidate_fragments(fragments: &[Fragment]) -> Fragment {
    let start_ts = fragments.iter().map(|f| f.start_ts).min().unwrap_or(0);
    let end_ts = fragments.iter().map(|f| f.end_ts).max().unwrap_or(start_ts);
    let seq = fragments.iter().map(|f| f.id.seq).max().unwrap_or(0);

    let entries = view::merge(fragments).into_entries();
    Fragment::new(start_ts, end_ts, FragmentId::new(seq), entries)
}
