use super::loading::{LoadContext, SessionResolver};
use super::observer::{ChangeEvent, ChangeKind, ChangeObserver};
use crate::codec::Codec;
use crate::config::SessionConfig;
use crate::core::{OrmError, QueryBuildError, Result};
use crate::marshal;
use crate::query::{Delete, Select, Statement, Update, save};
use crate::schema::{Entity, SchemaRegistry, TableDescriptor};
use crate::storage::{Row, RowCursor, SqliteStorage, Storage, WriteOutcome};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, RwLock};

/// Owns one schema registry and one storage handle, and exposes CRUD on top
/// of them.
///
/// # Examples
///
/// ```ignore
/// let session = Session::memory()?;
/// session.create_table::<Note>()?;
///
/// let mut note = Note { title: "a".into(), pinned: true, ..Default::default() };
/// let id = session.save(&mut note)?;
/// let loaded = session.load::<Note>(id)?;
/// ```
pub struct Session {
    registry: SchemaRegistry,
    storage: Box<dyn Storage>,
    config: SessionConfig,
    observers: RwLock<Vec<Arc<dyn ChangeObserver>>>,
}

impl Session {
    /// Opens the SQLite database named by the configuration.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let storage = SqliteStorage::open(&config)?;
        Ok(Self::with_storage(storage, config))
    }

    pub fn open_url(url: &str) -> Result<Self> {
        let config = SessionConfig::from_url(url).map_err(OrmError::Config)?;
        Self::open(config)
    }

    pub fn memory() -> Result<Self> {
        Self::open(SessionConfig::memory())
    }

    pub fn with_storage(storage: impl Storage + 'static, config: SessionConfig) -> Self {
        Self::with_registry(SchemaRegistry::default(), storage, config)
    }

    pub fn with_registry(
        registry: SchemaRegistry,
        storage: impl Storage + 'static,
        config: SessionConfig,
    ) -> Self {
        info!(
            "Session ready (database: {}, reference depth: {})",
            config.database, config.reference_depth
        );
        Self {
            registry,
            storage: Box::new(storage),
            config,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    pub fn describe<T: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        self.registry.describe::<T>()
    }

    pub fn table_name_of<T: Entity>(&self) -> Result<String> {
        self.registry.table_name_of::<T>()
    }

    /// Must happen before any table using the codec's type is described.
    pub fn register_codec<C: Codec>(&self, codec: C) -> Result<()> {
        self.registry.codecs().register(codec)
    }

    pub fn create_table<T: Entity>(&self) -> Result<()> {
        let descriptor = self.describe::<T>()?;
        let sql = descriptor.create_table_sql();
        if self.config.log_statements {
            debug!("{}", sql);
        }
        self.storage.execute_batch(&sql)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Inserts a new entity or updates a persisted one. Returns its identity.
    pub fn save<T: Entity>(&self, entity: &mut T) -> Result<i64> {
        let descriptor = self.describe::<T>()?;
        let values = marshal::to_row(entity, &descriptor).into_logged();

        match entity.identity().get() {
            None => {
                let outcome = self.write(&save::insert(&descriptor, values))?;
                let id = outcome.last_insert_id;
                entity.identity_mut().assign(id);
                self.notify(&ChangeEvent::new(
                    descriptor.table_name(),
                    Some(id),
                    ChangeKind::Insert,
                ));
                Ok(id)
            }
            Some(id) => {
                if let Some(statement) = save::update_by_id(&descriptor, values, id) {
                    let outcome = self.write(&statement)?;
                    if outcome.rows_affected == 0 {
                        warn!("{}#{} no longer exists; nothing updated", descriptor.table_name(), id);
                        return Ok(id);
                    }
                }
                self.notify(&ChangeEvent::new(
                    descriptor.table_name(),
                    Some(id),
                    ChangeKind::Update,
                ));
                Ok(id)
            }
        }
    }

    /// Deletes the entity's row. The in-memory identity is kept.
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<usize> {
        match entity.identity().get() {
            Some(id) => self.delete_by_id::<T>(id),
            None => Ok(0),
        }
    }

    pub fn delete_by_id<T: Entity>(&self, id: i64) -> Result<usize> {
        let descriptor = self.describe::<T>()?;
        let outcome = self.write(&save::delete_by_id(&descriptor, id))?;
        if outcome.rows_affected > 0 {
            self.notify(&ChangeEvent::new(
                descriptor.table_name(),
                Some(id),
                ChangeKind::Delete,
            ));
        }
        Ok(outcome.rows_affected)
    }

    /// `Ok(None)` when no row has this identity.
    pub fn load<T: Entity>(&self, id: i64) -> Result<Option<T>> {
        let descriptor = self.describe::<T>()?;
        let mut cursor = self.query_rows(&save::select_by_id(&descriptor, id))?;
        match cursor.next() {
            Some(row) => Ok(Some(self.materialize(&row, &descriptor)?)),
            None => Ok(None),
        }
    }

    /// Deletes every row and resets the table's auto-increment counter.
    pub fn truncate<T: Entity>(&self) -> Result<usize> {
        let descriptor = self.describe::<T>()?;
        let statement = Statement::new(format!("DELETE FROM {}", descriptor.table_name()), Vec::new());
        let outcome = self.write(&statement)?;
        self.storage.reset_sequence(descriptor.table_name())?;
        self.notify(&ChangeEvent::new(
            descriptor.table_name(),
            None,
            ChangeKind::Truncate,
        ));
        Ok(outcome.rows_affected)
    }

    /// Children of `C` whose `column` references `parent`. Empty for an
    /// unsaved parent.
    pub fn many<C: Entity, P: Entity>(&self, parent: &P, column: &str) -> Result<Vec<C>> {
        let Some(id) = parent.identity().get() else {
            return Ok(Vec::new());
        };
        let descriptor = self.describe::<C>()?;
        if descriptor.field(column).is_none() {
            return Err(QueryBuildError::UnknownColumn {
                table: descriptor.table_name().to_string(),
                column: column.to_string(),
            }
            .into());
        }
        let predicate = format!("{}.{} = ?", descriptor.table_name(), column);
        self.select()
            .from::<C>()?
            .filter(&predicate, crate::params![id])
            .fetch_all()
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn select(&self) -> Select<'_> {
        Select::new(self)
    }

    pub fn update<T: Entity>(&self) -> Result<Update<'_, T>> {
        Update::new(self)
    }

    pub fn delete_query(&self) -> Delete<'_> {
        Delete::new(self)
    }

    // ------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------

    pub fn add_observer(&self, observer: Arc<dyn ChangeObserver>) -> Result<()> {
        self.observers.write()?.push(observer);
        Ok(())
    }

    /// Registers a channel observer and returns its receiving end.
    pub fn subscribe(&self) -> Result<Receiver<ChangeEvent>> {
        let (sender, receiver) = mpsc::channel();
        self.add_observer(Arc::new(sender))?;
        Ok(receiver)
    }

    pub(crate) fn notify(&self, event: &ChangeEvent) {
        match self.observers.read() {
            Ok(observers) => {
                for observer in observers.iter() {
                    observer.on_change(event);
                }
            }
            Err(err) => warn!("Observer list unavailable: {}", err),
        }
    }

    // ------------------------------------------------------------------
    // Storage plumbing
    // ------------------------------------------------------------------

    pub(crate) fn write(&self, statement: &Statement) -> Result<WriteOutcome> {
        statement.validate()?;
        self.log_statement(statement);
        Ok(self.storage.execute_write(&statement.sql, &statement.args)?)
    }

    pub(crate) fn query_rows(&self, statement: &Statement) -> Result<RowCursor> {
        statement.validate()?;
        self.log_statement(statement);
        Ok(self.storage.query(&statement.sql, &statement.args)?)
    }

    /// Row to entity, following references up to the configured depth.
    pub(crate) fn materialize<T: Entity>(&self, row: &Row, descriptor: &TableDescriptor) -> Result<T> {
        let mut context = LoadContext::new(self.config.reference_depth);
        self.materialize_with(row, descriptor, &mut context)
    }

    pub(crate) fn materialize_with<T: Entity>(
        &self,
        row: &Row,
        descriptor: &TableDescriptor,
        context: &mut LoadContext,
    ) -> Result<T> {
        let id = row
            .get_by_name(descriptor.id_column())
            .and_then(|value| value.as_i64());
        let entered = match id {
            Some(id) => context.enter(descriptor.table_name(), id),
            None => false,
        };

        let decoded = marshal::from_row_with::<T, _>(
            row,
            descriptor,
            &mut SessionResolver {
                session: self,
                context: &mut *context,
            },
        );

        if let (true, Some(id)) = (entered, id) {
            context.leave(descriptor.table_name(), id);
        }
        Ok(decoded?.into_logged())
    }

    fn log_statement(&self, statement: &Statement) {
        if self.config.log_statements {
            debug!("{}", statement);
        }
    }
}
