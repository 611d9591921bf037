//! Intake for pages shipped by other nodes
//!
//! The catcher fills a temporary store under its own directory. `swap`
//! replaces it with a fresh one and hands back the filled store, closed, for
//! merging into the local frontier.

use crate::page::Page;
use crate::store::{OpenMode, PageStore, StoreError};
use crate::{FrontierError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatcherState {
    /// Not accepting pages
    Stopped,
    /// Accepting pages into the current temporary store
    Active,
    /// Closing its last store; rejects pages
    Draining,
}

struct Inner {
    state: CatcherState,
    store: Option<PageStore>,
    generation: u64,
    caught: u64,
}

pub struct PageCatcher {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl PageCatcher {
    /// Creates a stopped catcher keeping its stores under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            inner: Mutex::new(Inner {
                state: CatcherState::Stopped,
                store: None,
                generation: 0,
                caught: 0,
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| FrontierError::Pipeline("catcher lock poisoned".to_string()))
    }

    pub fn state(&self) -> CatcherState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(CatcherState::Stopped)
    }

    /// Pages caught since the last swap
    pub fn caught(&self) -> u64 {
        self.inner.lock().map(|inner| inner.caught).unwrap_or(0)
    }

    fn fresh_store(&self, inner: &mut Inner) -> Result<PageStore> {
        inner.generation += 1;
        let store = PageStore::new(self.dir.join(format!("caught-{}", inner.generation)));
        store.destroy()?;
        store.open(OpenMode::write())?;
        Ok(store)
    }

    /// Starts accepting pages; a no-op if already active
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.state {
            CatcherState::Active => Ok(()),
            CatcherState::Draining => Err(StoreError::AlreadyOpen.into()),
            CatcherState::Stopped => {
                let store = self.fresh_store(&mut inner)?;
                inner.store = Some(store);
                inner.caught = 0;
                inner.state = CatcherState::Active;
                tracing::debug!("Catcher active in {}", self.dir.display());
                Ok(())
            }
        }
    }

    /// Stores a page sent by another node
    pub fn catch(&self, page: &Page) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.state != CatcherState::Active {
            return Err(StoreError::NotOpenForWriting.into());
        }
        let store = inner.store.as_ref().ok_or(StoreError::NotOpenForWriting)?;
        store.add_page(page)?;
        inner.caught += 1;
        Ok(())
    }

    /// Replaces the temporary store and returns the filled one, closed
    pub fn swap(&self) -> Result<PageStore> {
        let (filled, caught) = {
            let mut inner = self.lock()?;
            if inner.state != CatcherState::Active {
                return Err(StoreError::NotOpenForWriting.into());
            }
            let fresh = self.fresh_store(&mut inner)?;
            let filled = inner
                .store
                .replace(fresh)
                .ok_or(StoreError::NotOpenForWriting)?;
            let caught = std::mem::take(&mut inner.caught);
            (filled, caught)
        };

        filled.close()?;
        tracing::debug!("Catcher swapped out {} pages", caught);
        Ok(filled)
    }

    /// Stops accepting pages and returns whatever was caught, closed
    pub fn stop(&self) -> Result<Option<PageStore>> {
        let store = {
            let mut inner = self.lock()?;
            if inner.state != CatcherState::Active {
                return Ok(None);
            }
            inner.state = CatcherState::Draining;
            inner.store.take()
        };

        let closed = match store {
            Some(store) => {
                store.close()?;
                Some(store)
            }
            None => None,
        };
        self.lock()?.state = CatcherState::Stopped;
        Ok(closed)
    }
}
