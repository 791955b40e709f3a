//! In-process transport: every rank's engine shares stream state through a hub.
//!
//! A step becomes visible to readers once every writer rank has ended it. Puts
//! and gets are deferred: they are validated when staged and applied in one go
//! by `perform_puts` / `perform_gets` (or `end_step`).

use crate::comm::Communicator;
use crate::data::ScalarType;
use crate::transport::{
    GetBatch, GetTicket, PutBatch, ReadEngine, Selection, Shape, StoredShape, TransportError,
    TransportFactory, VarId, VariableDecl, VariableInfo, WriteEngine, canonical_engine,
    stream_is_file_based,
};
use bytes::Bytes;
use dashmap::DashMap;
use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

enum StoredVar {
    Value {
        scalar: ScalarType,
        bytes: Bytes,
    },
    Global {
        scalar: ScalarType,
        len: u64,
        data: Vec<u8>,
    },
    Blocks {
        scalar: ScalarType,
        blocks: BTreeMap<usize, Bytes>,
    },
}

impl StoredVar {
    fn scalar(&self) -> ScalarType {
        match self {
            StoredVar::Value { scalar, .. }
            | StoredVar::Global { scalar, .. }
            | StoredVar::Blocks { scalar, .. } => *scalar,
        }
    }

    fn info(&self) -> VariableInfo {
        let size = self.scalar().size() as u64;
        let shape = match self {
            StoredVar::Value { .. } => StoredShape::Scalar,
            StoredVar::Global { len, .. } => StoredShape::Global { len: *len },
            StoredVar::Blocks { blocks, .. } => StoredShape::Blocks {
                lens: blocks
                    .iter()
                    .map(|(&r, b)| (r, b.len() as u64 / size))
                    .collect(),
            },
        };
        VariableInfo {
            scalar: self.scalar(),
            shape,
        }
    }

    fn select(&self, path: &str, selection: Selection) -> Result<Bytes, TransportError> {
        let size = self.scalar().size() as u64;
        match (self, selection) {
            (StoredVar::Value { bytes, .. }, _) => Ok(bytes.clone()),
            (StoredVar::Global { data, .. }, Selection::All) => Ok(Bytes::copy_from_slice(data)),
            (StoredVar::Global { len, data, .. }, Selection::Range { start, count }) => {
                if start + count > *len {
                    return Err(TransportError::OutOfRange {
                        path: path.to_owned(),
                        start,
                        count,
                        len: *len,
                    });
                }
                let lo = (start * size) as usize;
                let hi = ((start + count) * size) as usize;
                Ok(Bytes::copy_from_slice(&data[lo..hi]))
            }
            (StoredVar::Global { .. }, Selection::WriteBlock(_)) => {
                Err(TransportError::ShapeMismatch {
                    path: path.to_owned(),
                    detail: "global arrays have no write blocks".into(),
                })
            }
            (StoredVar::Blocks { blocks, .. }, Selection::All) => blocks
                .values()
                .next()
                .cloned()
                .ok_or_else(|| TransportError::NoSuchWriteBlock {
                    path: path.to_owned(),
                    block: 0,
                }),
            (StoredVar::Blocks { blocks, .. }, Selection::WriteBlock(block)) => blocks
                .get(&block)
                .cloned()
                .ok_or_else(|| TransportError::NoSuchWriteBlock {
                    path: path.to_owned(),
                    block,
                }),
            (StoredVar::Blocks { .. }, Selection::Range { .. }) => {
                Err(TransportError::ShapeMismatch {
                    path: path.to_owned(),
                    detail: "per-writer variables cannot be read by range".into(),
                })
            }
        }
    }
}

#[derive(Default)]
struct StepData {
    vars: HashMap<String, StoredVar>,
    ended_by: HashSet<usize>,
}

struct StreamState {
    n_writers: usize,
    closed_writers: HashSet<usize>,
    steps: Vec<StepData>,
}

impl StreamState {
    fn new(n_writers: usize) -> Self {
        Self {
            n_writers,
            closed_writers: HashSet::new(),
            steps: Vec::new(),
        }
    }

    fn committed(&self, step: usize) -> bool {
        self.steps
            .get(step)
            .is_some_and(|s| s.ended_by.len() == self.n_writers)
    }

    fn all_writers_closed(&self) -> bool {
        self.closed_writers.len() == self.n_writers
    }
}

/// Shared registry of in-process streams. Clones share the same streams.
#[derive(Clone, Default)]
pub struct MemoryHub {
    streams: Arc<DashMap<String, Arc<Mutex<StreamState>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of steps every writer of `stream` has ended.
    pub fn committed_steps(&self, stream: &str) -> usize {
        self.streams.get(stream).map_or(0, |s| {
            let st = s.lock();
            (0..st.steps.len()).take_while(|&i| st.committed(i)).count()
        })
    }

    pub fn writer(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<MemoryWriter, TransportError> {
        canonical_engine(engine).ok_or_else(|| TransportError::UnknownEngine(engine.into()))?;
        let state = {
            let mut entry = self
                .streams
                .entry(stream.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(StreamState::new(comm.size()))));
            // a finished stream is replaced by the next session writing to the same name
            if entry.lock().all_writers_closed() {
                *entry = Arc::new(Mutex::new(StreamState::new(comm.size())));
            }
            entry.clone()
        };
        {
            let st = state.lock();
            if st.n_writers != comm.size() {
                return Err(TransportError::ShapeMismatch {
                    path: stream.to_owned(),
                    detail: format!(
                        "opened by a group of {} while {} writers are active",
                        comm.size(),
                        st.n_writers
                    ),
                });
            }
        }
        log::debug!("rank {} opened writer on \"{stream}\" ({engine})", comm.rank());
        Ok(MemoryWriter {
            state,
            rank: comm.rank(),
            vars: Vec::new(),
            index: HashMap::new(),
            generation: 0,
            puts: PutBatch::default(),
            step: None,
            next_step: 0,
            closed: false,
        })
    }

    pub fn reader(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<MemoryReader, TransportError> {
        canonical_engine(engine).ok_or_else(|| TransportError::UnknownEngine(engine.into()))?;
        let state = self
            .streams
            .get(stream)
            .map(|s| s.clone())
            .ok_or_else(|| TransportError::StreamNotFound(stream.into()))?;
        {
            let st = state.lock();
            if !st.committed(0) {
                return Err(if st.all_writers_closed() {
                    TransportError::EndOfStream
                } else {
                    TransportError::StepNotReady
                });
            }
        }
        log::debug!("rank {} opened reader on \"{stream}\" ({engine})", comm.rank());
        Ok(MemoryReader {
            state,
            file_based: stream_is_file_based(engine),
            step: 0,
            pending: Vec::new(),
            closed: false,
        })
    }
}

impl TransportFactory for MemoryHub {
    fn open_writer(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<Box<dyn WriteEngine>, TransportError> {
        Ok(Box::new(self.writer(stream, engine, comm)?))
    }

    fn open_reader(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<Box<dyn ReadEngine>, TransportError> {
        Ok(Box::new(self.reader(stream, engine, comm)?))
    }
}

struct DeclaredVar {
    decl: VariableDecl,
    extent: Option<u64>,
}

/// One writer rank's engine.
pub struct MemoryWriter {
    state: Arc<Mutex<StreamState>>,
    rank: usize,
    vars: Vec<DeclaredVar>,
    index: HashMap<String, usize>,
    generation: u32,
    puts: PutBatch,
    step: Option<usize>,
    next_step: usize,
    closed: bool,
}

impl MemoryWriter {
    fn declared(&self, var: VarId) -> Result<&DeclaredVar, TransportError> {
        if var.generation() != self.generation {
            return Err(TransportError::StaleHandle);
        }
        self.vars.get(var.index()).ok_or(TransportError::StaleHandle)
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

fn store(
    step: &mut StepData,
    rank: usize,
    decl: &VariableDecl,
    bytes: Bytes,
) -> Result<(), TransportError> {
    let path = &decl.path;
    let size = decl.scalar.size() as u64;
    if let Some(existing) = step.vars.get(path) {
        if existing.scalar() != decl.scalar {
            return Err(TransportError::TypeMismatch {
                path: path.clone(),
                expected: existing.scalar(),
                found: decl.scalar,
            });
        }
    }
    match decl.shape {
        Shape::Scalar => {
            step.vars.insert(
                path.clone(),
                StoredVar::Value {
                    scalar: decl.scalar,
                    bytes,
                },
            );
        }
        Shape::Global {
            local,
            global,
            offset,
        } => {
            if offset + local > global {
                return Err(TransportError::OutOfRange {
                    path: path.clone(),
                    start: offset,
                    count: local,
                    len: global,
                });
            }
            let slot = step
                .vars
                .entry(path.clone())
                .or_insert_with(|| StoredVar::Global {
                    scalar: decl.scalar,
                    len: global,
                    data: vec![0; (global * size) as usize],
                });
            match slot {
                StoredVar::Global { len, data, .. } if *len == global => {
                    let lo = (offset * size) as usize;
                    data[lo..lo + bytes.len()].copy_from_slice(&bytes);
                }
                StoredVar::Global { len, .. } => {
                    return Err(TransportError::ShapeMismatch {
                        path: path.clone(),
                        detail: format!("global length {global} disagrees with {len}"),
                    });
                }
                _ => {
                    return Err(TransportError::ShapeMismatch {
                        path: path.clone(),
                        detail: "declared global here, differently by another writer".into(),
                    });
                }
            }
        }
        Shape::Variable => {
            let slot = step
                .vars
                .entry(path.clone())
                .or_insert_with(|| StoredVar::Blocks {
                    scalar: decl.scalar,
                    blocks: BTreeMap::new(),
                });
            match slot {
                StoredVar::Blocks { blocks, .. } => {
                    blocks.insert(rank, bytes);
                }
                _ => {
                    return Err(TransportError::ShapeMismatch {
                        path: path.clone(),
                        detail: "declared per-writer here, differently by another writer".into(),
                    });
                }
            }
        }
    }
    Ok(())
}

impl WriteEngine for MemoryWriter {
    fn define_variable(&mut self, decl: VariableDecl) -> Result<VarId, TransportError> {
        self.check_open()?;
        if let Some(&first) = self.index.get(&decl.path) {
            // a global array may be declared once per locally owned block
            let prev = &self.vars[first].decl;
            let same_global = matches!(
                (prev.shape, decl.shape),
                (Shape::Global { global: a, .. }, Shape::Global { global: b, .. }) if a == b
            );
            if !same_global || prev.scalar != decl.scalar {
                return Err(TransportError::AlreadyDefined(decl.path));
            }
        }
        let idx = self.vars.len();
        self.index.entry(decl.path.clone()).or_insert(idx);
        self.vars.push(DeclaredVar { decl, extent: None });
        Ok(VarId::new(idx as u32, self.generation))
    }

    fn inquire_variable(&self, path: &str) -> Option<VarId> {
        self.index
            .get(path)
            .map(|&i| VarId::new(i as u32, self.generation))
    }

    fn set_extent(&mut self, var: VarId, len: u64) -> Result<(), TransportError> {
        self.declared(var)?;
        let dv = &mut self.vars[var.index()];
        if dv.decl.shape != Shape::Variable {
            return Err(TransportError::ShapeMismatch {
                path: dv.decl.path.clone(),
                detail: "only per-writer variables take an extent at write time".into(),
            });
        }
        dv.extent = Some(len);
        Ok(())
    }

    fn put_deferred(&mut self, var: VarId, data: Bytes) -> Result<(), TransportError> {
        self.check_open()?;
        if self.step.is_none() {
            return Err(TransportError::StepState("put outside of a step"));
        }
        let dv = self.declared(var)?;
        let expected = match dv.decl.expected_bytes() {
            Some(n) => n,
            None => {
                let len = dv
                    .extent
                    .ok_or_else(|| TransportError::ExtentUnset(dv.decl.path.clone()))?;
                len * dv.decl.scalar.size() as u64
            }
        };
        if data.len() as u64 != expected {
            return Err(TransportError::SizeMismatch {
                path: dv.decl.path.clone(),
                expected,
                got: data.len() as u64,
            });
        }
        self.puts.stage(var, data);
        Ok(())
    }

    fn perform_puts(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        let step = self
            .step
            .ok_or(TransportError::StepState("perform_puts outside of a step"))?;
        if self.puts.is_empty() {
            return Ok(());
        }
        log::trace!(
            "rank {} flushing {} puts ({} bytes)",
            self.rank,
            self.puts.len(),
            self.puts.byte_len()
        );
        let staged: Vec<_> = self.puts.drain().collect();
        let mut st = self.state.lock();
        let data = &mut st.steps[step];
        for (var, bytes) in staged {
            let dv = self.declared(var)?;
            store(data, self.rank, &dv.decl, bytes)?;
        }
        Ok(())
    }

    fn begin_step(&mut self) -> Result<(), TransportError> {
        self.check_open()?;
        if self.step.is_some() {
            return Err(TransportError::StepState("begin_step inside an open step"));
        }
        let s = self.next_step;
        let mut st = self.state.lock();
        while st.steps.len() <= s {
            st.steps.push(StepData::default());
        }
        self.step = Some(s);
        Ok(())
    }

    fn end_step(&mut self) -> Result<(), TransportError> {
        self.perform_puts()?;
        let s = self
            .step
            .take()
            .ok_or(TransportError::StepState("end_step without begin_step"))?;
        self.state.lock().steps[s].ended_by.insert(self.rank);
        self.next_step += 1;
        Ok(())
    }

    fn abort_step(&mut self) {
        if let Some(s) = self.step.take() {
            log::debug!("rank {} abandons step {s}", self.rank);
        }
        self.puts.clear();
    }

    fn remove_all_variables(&mut self) {
        self.vars.clear();
        self.index.clear();
        self.puts.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        if self.step.is_some() {
            self.end_step()?;
        }
        self.state.lock().closed_writers.insert(self.rank);
        self.closed = true;
        Ok(())
    }
}

/// One reader rank's engine.
pub struct MemoryReader {
    state: Arc<Mutex<StreamState>>,
    file_based: bool,
    step: usize,
    pending: Vec<(String, Selection)>,
    closed: bool,
}

impl ReadEngine for MemoryReader {
    fn inquire(&self, path: &str) -> Option<VariableInfo> {
        let st = self.state.lock();
        st.steps
            .get(self.step)
            .and_then(|s| s.vars.get(path))
            .map(StoredVar::info)
    }

    fn get_deferred(
        &mut self,
        path: &str,
        selection: Selection,
    ) -> Result<GetTicket, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.pending.push((path.to_owned(), selection));
        Ok(GetTicket(self.pending.len() - 1))
    }

    fn perform_gets(&mut self) -> Result<GetBatch, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let pending = std::mem::take(&mut self.pending);
        let st = self.state.lock();
        let step = st.steps.get(self.step).ok_or(TransportError::StepNotReady)?;
        let results = pending
            .iter()
            .map(|(path, sel)| {
                step.vars
                    .get(path)
                    .ok_or_else(|| TransportError::UnknownVariable(path.clone()))?
                    .select(path, *sel)
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!(
            "step {} delivered {} gets ({} bytes)",
            self.step,
            results.len(),
            results.iter().map(Bytes::len).sum::<usize>()
        );
        Ok(GetBatch::new(results))
    }

    fn advance(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.pending.clear();
        let st = self.state.lock();
        let next = self.step + 1;
        if st.committed(next) {
            self.step = next;
            Ok(())
        } else if st.all_writers_closed() {
            Err(TransportError::EndOfStream)
        } else {
            Err(TransportError::StepNotReady)
        }
    }

    fn current_step(&self) -> usize {
        self.step
    }

    fn is_file_based(&self) -> bool {
        self.file_based
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}
