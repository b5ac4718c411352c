//! Checkpoint persistence in Postgres binary COPY framing.
//!
//! A checkpoint is three sibling files sharing a stem: `{stem}.policy.pgcopy`
//! holds the normalized average strategy, `{stem}.regret.pgcopy` holds the raw
//! accumulator table, and `{stem}.meta.json` holds the progress scalars. A
//! stem resumes only when all three exist. Writers stage each sibling under a
//! temporary name and rename it into place, with the metadata landing last, so
//! an interrupted save never produces a stem that looks complete.
//!
//! Rows are settled before they are written, which is why the metadata carries
//! no discount or rng state: both derive from the epoch counter alone, and a
//! reloaded store starts from fresh multipliers.

use crate::error::SolverError;
use crate::error::SolverResult;
use crate::memory::Memory;
use crate::profile::Profile;
use crate::store::RegretStore;
use crate::store::TableStore;
use serde::Deserialize;
use serde::Serialize;
use snap_nlhe::Action;
use snap_nlhe::Fingerprint;
use snap_nlhe::Info;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Tag stamped into every metadata sibling, bumped when the blob layout
/// changes shape.
const FORMAT: &str = "snap.checkpoint.v1";

const POLICY: &str = "policy.pgcopy";
const REGRET: &str = "regret.pgcopy";
const META: &str = "meta.json";

/// Postgres signature header plus null flag and extension words.
/// https://www.postgresql.org/docs/current/static/sql-copy.html
fn header() -> &'static [u8] {
    b"PGCOPY\n\xFF\r\n\0\0\0\0\0\0\0\0\0"
}
/// Postgres end-of-data marker.
fn footer() -> u16 {
    0xFFFF
}

/// Progress scalars persisted beside the blobs.
#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    format: String,
    epochs: usize,
    players: usize,
    fingerprint: Option<String>,
}

/// Writes a complete checkpoint for the profile under the given stem.
pub fn save<S: RegretStore>(profile: &Profile<S>, dir: &Path, stem: &str) -> SolverResult<()> {
    fs::create_dir_all(dir)?;
    stage(dir, stem, POLICY, |file| write_policy(profile, file))?;
    stage(dir, stem, REGRET, |file| write_regret(profile, file))?;
    stage(dir, stem, META, |file| write_meta(profile, file))?;
    log::info!("checkpointed {} as {}/{}", profile, dir.display(), stem);
    Ok(())
}

/// Resumes the newest complete checkpoint in the directory.
///
/// Stems missing a sibling never resume: a directory holding partial stems
/// but no complete one reports incomplete rather than absent. Passing an
/// expected fingerprint turns an abstraction mismatch into a hard error
/// before any row is read.
pub fn load<S>(dir: &Path, expected: Option<Fingerprint>) -> SolverResult<Profile<S>>
where
    S: RegretStore + Default,
{
    let stem = discover(dir)?;
    let meta = read_meta(&sibling(dir, &stem, META))?;
    let fingerprint = verify(&meta, expected)?;
    let mut store = S::default();
    for (ref info, row) in read_regret(&sibling(dir, &stem, REGRET))? {
        let menu = row.iter().map(|(action, _)| *action).collect::<Vec<_>>();
        store.reserve(info, &menu);
        for (ref action, memory) in row {
            store.add_regret(info, action, memory.regret);
            store.add_weight(info, action, memory.weight);
            store.add_evalue(info, action, memory.evalue);
            store.add_counts(info, action, memory.counts);
        }
    }
    let profile = Profile::reload(store, meta.epochs, meta.players, fingerprint);
    log::info!("resumed {} from {}/{}", profile, dir.display(), stem);
    Ok(profile)
}

/// Loads a standalone strategy blob for real-time use.
///
/// The blob itself carries no fingerprint; that lives in the metadata
/// sibling. When the sibling is absent the policy still loads, loudly,
/// since the progress scalars only matter for resuming training and that
/// takes a full checkpoint anyway.
pub fn load_policy(blob: &Path, expected: Option<Fingerprint>) -> SolverResult<Profile<TableStore>> {
    let mut store = TableStore::default();
    for (ref info, row) in read_policy(blob)? {
        let menu = row.iter().map(|(action, _)| *action).collect::<Vec<_>>();
        store.reserve(info, &menu);
        for (ref action, density) in row {
            store.add_weight(info, action, density);
        }
    }
    let name = blob.to_string_lossy();
    let meta = name
        .strip_suffix(POLICY)
        .map(|prefix| PathBuf::from(format!("{prefix}{META}")));
    match meta.filter(|path| path.exists()) {
        Some(ref path) => {
            let meta = read_meta(path)?;
            let fingerprint = verify(&meta, expected)?;
            Ok(Profile::reload(store, meta.epochs, meta.players, fingerprint))
        }
        None => {
            log::warn!(
                "{} has no metadata sibling, so its abstraction cannot be verified",
                blob.display()
            );
            Ok(Profile::reload(store, 0, 2, expected.unwrap_or(Fingerprint::from(0))))
        }
    }
}

/// Newest resumable stem by metadata modification time.
fn discover(dir: &Path) -> SolverResult<String> {
    let mut stems = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        for kind in [POLICY, REGRET, META] {
            if let Some(stem) = name.strip_suffix(&format!(".{}", kind)) {
                stems.insert(stem.to_string());
            }
        }
    }
    let mut complete = Vec::new();
    let mut broken = None;
    for stem in stems {
        match missing(dir, &stem) {
            None => {
                let stamp = fs::metadata(sibling(dir, &stem, META))?.modified()?;
                complete.push((stamp, stem));
            }
            Some(kind) => broken = Some((stem, kind)),
        }
    }
    complete.sort();
    match (complete.pop(), broken) {
        (Some((_, stem)), _) => Ok(stem),
        (None, Some((stem, missing))) => Err(SolverError::IncompleteCheckpoint { stem, missing }),
        (None, None) => Err(SolverError::NoCheckpoint(dir.display().to_string())),
    }
}

/// First absent sibling of the stem, if any.
fn missing(dir: &Path, stem: &str) -> Option<&'static str> {
    [POLICY, REGRET, META]
        .into_iter()
        .find(|kind| !sibling(dir, stem, kind).exists())
}

fn sibling(dir: &Path, stem: &str, kind: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, kind))
}

/// Writes through a `.tmp` name and renames into place, so readers only
/// ever see finished siblings.
fn stage<F>(dir: &Path, stem: &str, kind: &str, write: F) -> SolverResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> SolverResult<()>,
{
    let target = sibling(dir, stem, kind);
    let staged = dir.join(format!("{}.{}.tmp", stem, kind));
    let mut file = BufWriter::new(File::create(&staged)?);
    write(&mut file)?;
    file.flush()?;
    fs::rename(&staged, &target)?;
    Ok(())
}

/// One row per (infoset, action): packed key, street path, action code,
/// advice density.
fn write_policy<S, W>(profile: &Profile<S>, file: &mut W) -> SolverResult<()>
where
    S: RegretStore,
    W: Write,
{
    use byteorder::WriteBytesExt;
    use byteorder::BE;
    file.write_all(header())?;
    for (ref info, row) in profile.store().scan() {
        let ref advice = profile.advice(info);
        for (ref action, _) in row {
            const N_FIELDS: u16 = 4;
            file.write_u16::<BE>(N_FIELDS)?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(info.present())?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(u64::from(info.path()))?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(action.code() as u64)?;
            file.write_u32::<BE>(size_of::<f32>() as u32)?;
            file.write_f32::<BE>(advice.density(action))?;
        }
    }
    file.write_u16::<BE>(footer())?;
    Ok(())
}

/// One row per (infoset, action): packed key, street path, action code,
/// then the full settled accumulator cell.
fn write_regret<S, W>(profile: &Profile<S>, file: &mut W) -> SolverResult<()>
where
    S: RegretStore,
    W: Write,
{
    use byteorder::WriteBytesExt;
    use byteorder::BE;
    file.write_all(header())?;
    for (ref info, row) in profile.store().scan() {
        for (ref action, memory) in row {
            const N_FIELDS: u16 = 7;
            file.write_u16::<BE>(N_FIELDS)?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(info.present())?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(u64::from(info.path()))?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(action.code() as u64)?;
            file.write_u32::<BE>(size_of::<f32>() as u32)?;
            file.write_f32::<BE>(memory.regret)?;
            file.write_u32::<BE>(size_of::<f32>() as u32)?;
            file.write_f32::<BE>(memory.weight)?;
            file.write_u32::<BE>(size_of::<f32>() as u32)?;
            file.write_f32::<BE>(memory.evalue)?;
            file.write_u32::<BE>(size_of::<u64>() as u32)?;
            file.write_u64::<BE>(memory.counts as u64)?;
        }
    }
    file.write_u16::<BE>(footer())?;
    Ok(())
}

fn write_meta<S, W>(profile: &Profile<S>, file: &mut W) -> SolverResult<()>
where
    S: RegretStore,
    W: Write,
{
    let meta = Meta {
        format: FORMAT.to_string(),
        epochs: profile.epochs(),
        players: profile.players(),
        fingerprint: Some(profile.fingerprint().to_string()),
    };
    serde_json::to_writer_pretty(file, &meta)?;
    Ok(())
}

fn read_meta(path: &Path) -> SolverResult<Meta> {
    let meta: Meta = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    if meta.format != FORMAT {
        log::warn!("checkpoint format {:?} predates {:?}", meta.format, FORMAT);
    }
    Ok(meta)
}

/// The fingerprint guardrail: a stored fingerprint must match the expected
/// one exactly, while an absent one downgrades to a loud warning.
fn verify(meta: &Meta, expected: Option<Fingerprint>) -> SolverResult<Fingerprint> {
    match meta.fingerprint.as_deref() {
        Some(hex) => {
            use serde::de::Error as _;
            let found = Fingerprint::try_from(hex)
                .map_err(|_| serde_json::Error::custom(format!("unreadable fingerprint {:?}", hex)))?;
            match expected {
                Some(expected) if expected != found => {
                    Err(SolverError::AbstractionMismatch { expected, found })
                }
                _ => Ok(found),
            }
        }
        None => {
            log::warn!("checkpoint carries no abstraction fingerprint, skipping the compatibility check");
            Ok(expected.unwrap_or(Fingerprint::from(0)))
        }
    }
}

/// Decodes a persisted action code. A well-framed row can still carry a
/// code outside the action grid; that surfaces as an error, not a panic,
/// like every other form of checkpoint corruption.
fn decode(code: u64) -> SolverResult<Action> {
    u8::try_from(code)
        .ok()
        .and_then(Action::decode)
        .ok_or(SolverError::UnknownAction { code })
}

fn read_policy(path: &Path) -> SolverResult<BTreeMap<Info, Vec<(Action, f32)>>> {
    use byteorder::ReadBytesExt;
    use byteorder::BE;
    use std::io::Read;
    use std::io::Seek;
    use std::io::SeekFrom;
    let mut rows: BTreeMap<Info, Vec<(Action, f32)>> = BTreeMap::new();
    let mut reader = BufReader::new(File::open(path)?);
    reader.seek(SeekFrom::Start(header().len() as u64))?;
    let mut buffer = [0u8; 2];
    while reader.read_exact(&mut buffer).is_ok() {
        if u16::from_be_bytes(buffer) != 4 {
            break;
        }
        reader.read_u32::<BE>()?;
        let present = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let history = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let code = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let density = reader.read_f32::<BE>()?;
        let info = Info::from_parts(present, history);
        let action = decode(code)?;
        rows.entry(info).or_default().push((action, density));
    }
    Ok(rows)
}

fn read_regret(path: &Path) -> SolverResult<BTreeMap<Info, Vec<(Action, Memory)>>> {
    use byteorder::ReadBytesExt;
    use byteorder::BE;
    use std::io::Read;
    use std::io::Seek;
    use std::io::SeekFrom;
    let mut rows: BTreeMap<Info, Vec<(Action, Memory)>> = BTreeMap::new();
    let mut reader = BufReader::new(File::open(path)?);
    reader.seek(SeekFrom::Start(header().len() as u64))?;
    let mut buffer = [0u8; 2];
    while reader.read_exact(&mut buffer).is_ok() {
        if u16::from_be_bytes(buffer) != 7 {
            break;
        }
        reader.read_u32::<BE>()?;
        let present = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let history = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let code = reader.read_u64::<BE>()?;
        reader.read_u32::<BE>()?;
        let regret = reader.read_f32::<BE>()?;
        reader.read_u32::<BE>()?;
        let weight = reader.read_f32::<BE>()?;
        reader.read_u32::<BE>()?;
        let evalue = reader.read_f32::<BE>()?;
        reader.read_u32::<BE>()?;
        let counts = reader.read_u64::<BE>()? as u32;
        let info = Info::from_parts(present, history);
        let action = decode(code)?;
        let memory = Memory {
            regret,
            weight,
            evalue,
            counts,
        };
        rows.entry(info).or_default().push((action, memory));
    }
    Ok(rows)
}
