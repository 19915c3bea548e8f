//! List synchronization controller.
//!
//! # Design
//! `TodoList` holds the current session's todos as last reported by the
//! server. Mutations are sent first; the local collection changes only after
//! the server answers, and then only by taking the server's object verbatim.
//! Nothing is patched locally, so fields this crate does not model survive.
//!
//! Mutators take `&mut self`, which serializes them per controller. Two
//! controllers (or two clients) editing the same todo race on the server and
//! the last response each one sees wins locally; there is no versioning.
//!
//! Failures are never retried, and a 401 does not log the session out; it
//! surfaces as `ApiError::Unauthorized` inside `Error::Transport`.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::client::TodoClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, Error};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::SessionGuard;
use crate::types::{CreateTodo, ListFilter, Todo, TodoId, UpdateTodo};

const CREATE_CONTEXT: &str = "creating todo";
const LIST_CONTEXT: &str = "getting todo list.";
const GET_CONTEXT: &str = "getting todo item.";
const UPDATE_CONTEXT: &str = "updating todo item.";
const DELETE_CONTEXT: &str = "deleting todo item.";

#[derive(Debug)]
pub struct TodoList {
    client: TodoClient,
    session: Arc<SessionGuard>,
    items: Vec<Todo>,
    filter: ListFilter,
}

impl TodoList {
    pub fn new(client: TodoClient, session: Arc<SessionGuard>) -> Self {
        Self {
            client,
            session,
            items: Vec::new(),
            filter: ListFilter::default(),
        }
    }

    pub fn from_config(config: &ClientConfig, session: Arc<SessionGuard>) -> Self {
        Self::new(config.todo_client(), session)
    }

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    /// The filter the collection was last loaded with.
    pub fn filter(&self) -> ListFilter {
        self.filter
    }

    pub fn find(&self, id: &TodoId) -> Option<&Todo> {
        self.items.iter().find(|todo| todo.id == *id)
    }

    /// Fetch the todos matching `filter` and replace the collection with
    /// them.
    #[instrument(skip(self))]
    pub async fn load(&mut self, filter: ListFilter) -> Result<&[Todo], Error> {
        let request = self.client.build_list_todos(&filter);
        let todos = self
            .exchange(request, |c, r| c.parse_list_todos(r))
            .await
            .map_err(|e| Error::transport(LIST_CONTEXT, e))?;

        debug!(count = todos.len(), "loaded todos");
        self.items = todos;
        self.filter = filter;
        Ok(&self.items)
    }

    /// `load` again with the current filter.
    pub async fn reload(&mut self) -> Result<&[Todo], Error> {
        self.load(self.filter).await
    }

    /// Fetch one todo from the server. The collection is left alone.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &TodoId) -> Result<Todo, Error> {
        let request = self.client.build_get_todo(id);
        self.exchange(request, |c, r| c.parse_get_todo(r))
            .await
            .map_err(|e| Error::transport(GET_CONTEXT, e))
    }

    /// Create a todo and append the server's copy to the collection.
    ///
    /// A title that is empty after trimming is rejected without a request.
    #[instrument(skip(self))]
    pub async fn create(&mut self, title: &str) -> Result<Todo, Error> {
        if title.trim().is_empty() {
            return Err(Error::InvalidInput("todo title must not be empty"));
        }

        let input = CreateTodo {
            title: title.to_string(),
        };
        let request = self
            .client
            .build_create_todo(&input)
            .map_err(|e| Error::transport(CREATE_CONTEXT, e))?;
        let todo = self
            .exchange(request, |c, r| c.parse_create_todo(r))
            .await
            .map_err(|e| Error::transport(CREATE_CONTEXT, e))?;

        info!(id = %todo.id, "created todo");
        self.items.push(todo.clone());
        Ok(todo)
    }

    /// Change a todo's title. Returns `None` without a request when the
    /// title is unchanged.
    #[instrument(skip(self))]
    pub async fn rename(&mut self, id: &TodoId, title: &str) -> Result<Option<Todo>, Error> {
        let current = self.find(id).ok_or_else(|| Error::NotFound(id.clone()))?;
        if current.title == title {
            debug!("title unchanged; not sending");
            return Ok(None);
        }

        let input = UpdateTodo {
            title: Some(title.to_string()),
            ..UpdateTodo::default()
        };
        self.update(id, &input).await.map(Some)
    }

    /// Flip a todo's completion flag.
    #[instrument(skip(self))]
    pub async fn toggle_completed(&mut self, id: &TodoId) -> Result<Todo, Error> {
        let current = self.find(id).ok_or_else(|| Error::NotFound(id.clone()))?;
        let input = UpdateTodo {
            completed: Some(!current.completed),
            ..UpdateTodo::default()
        };
        self.update(id, &input).await
    }

    /// Advance a todo's rank one step along low → mid → high → low.
    #[instrument(skip(self))]
    pub async fn change_rank(&mut self, id: &TodoId) -> Result<Todo, Error> {
        let current = self.find(id).ok_or_else(|| Error::NotFound(id.clone()))?;
        let input = UpdateTodo {
            rank: Some(current.rank.next()),
            ..UpdateTodo::default()
        };
        self.update(id, &input).await
    }

    /// Delete a todo. It leaves the collection only once the server has
    /// confirmed the delete.
    #[instrument(skip(self))]
    pub async fn remove(&mut self, id: &TodoId) -> Result<(), Error> {
        let request = self.client.build_delete_todo(id);
        self.exchange(request, |c, r| c.parse_delete_todo(r))
            .await
            .map_err(|e| Error::transport(DELETE_CONTEXT, e))?;

        info!(%id, "deleted todo");
        self.items.retain(|todo| todo.id != *id);
        Ok(())
    }

    async fn update(&mut self, id: &TodoId, input: &UpdateTodo) -> Result<Todo, Error> {
        let request = self
            .client
            .build_update_todo(id, input)
            .map_err(|e| Error::transport(UPDATE_CONTEXT, e))?;
        let todo = self
            .exchange(request, |c, r| c.parse_update_todo(r))
            .await
            .map_err(|e| Error::transport(UPDATE_CONTEXT, e))?;

        self.reconcile(todo.clone());
        Ok(todo)
    }

    /// Replace the held todo with the same id by `todo`. A todo that is no
    /// longer held is not re-inserted.
    fn reconcile(&mut self, todo: Todo) {
        match self.items.iter_mut().find(|held| held.id == todo.id) {
            Some(held) => *held = todo,
            None => debug!(id = %todo.id, "updated todo is no longer in the list"),
        }
    }

    async fn exchange<T>(
        &self,
        request: HttpRequest,
        parse: impl FnOnce(&TodoClient, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let response = self.session.send(request).await?;
        parse(&self.client, response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::AuthClient;
    use crate::error::ErrorKind;
    use crate::http::HttpMethod;
    use crate::store::MemoryStore;
    use crate::testutil::ScriptedTransport;
    use crate::types::Rank;

    const ITEMS_URL: &str = "http://localhost:3000/api/todos";

    fn controller(transport: &Arc<ScriptedTransport>) -> TodoList {
        let session = SessionGuard::new(
            AuthClient::new("http://localhost:3000/api/users"),
            MemoryStore::new(),
            transport.clone(),
        );
        session.persist("a.b.c").unwrap();
        TodoList::new(TodoClient::new(ITEMS_URL), Arc::new(session))
    }

    /// A controller already holding two todos.
    async fn loaded(transport: &Arc<ScriptedTransport>) -> TodoList {
        let mut list = controller(transport);
        transport.push_json(
            200,
            json!([
                { "id": 1, "title": "Walk dog", "completed": false, "rank": "low" },
                { "id": 2, "title": "Buy milk", "completed": false, "rank": "high", "created_at": 100 },
            ]),
        );
        list.load(ListFilter::default()).await.unwrap();
        list
    }

    #[tokio::test]
    async fn load_replaces_collection_and_sends_filter() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;
        assert_eq!(list.items().len(), 2);

        transport.push_json(200, json!([{ "id": 3, "title": "Other", "completed": true, "rank": "mid" }]));
        let items = list.load(ListFilter::completed(true)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, TodoId::from(3));
        assert_eq!(list.filter(), ListFilter::completed(true));

        let sent = transport.requests();
        assert_eq!(sent[1].path, format!("{ITEMS_URL}?completed=true"));
        assert_eq!(sent[1].header("authorization"), Some("Bearer a.b.c"));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_collection() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        transport.push_response(500, "boom");
        let err = list.reload().await.unwrap_err();
        assert!(err.to_string().ends_with(LIST_CONTEXT));
        assert_eq!(list.items().len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_blank_titles_without_a_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;
        let before = list.items().to_vec();

        for title in ["", "   ", "\t\n"] {
            let err = list.create(title).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert_eq!(transport.request_count(), 1);
        assert_eq!(list.items(), before.as_slice());
    }

    #[tokio::test]
    async fn create_appends_server_copy() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        let server_copy = json!({ "id": 7, "title": "Buy milk", "completed": false, "rank": "mid" });
        transport.push_json(201, server_copy.clone());
        list.create("Buy milk").await.unwrap();

        let last = list.items().last().unwrap();
        assert_eq!(serde_json::to_value(last).unwrap(), server_copy);
        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Post);
        let body: serde_json::Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "title": "Buy milk" }));
    }

    #[tokio::test]
    async fn rename_with_same_title_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        let outcome = list.rename(&TodoId::from(1), "Walk dog").await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn rename_replaces_item_with_server_copy() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        transport.push_json(
            200,
            json!({ "id": 2, "title": "Buy oat milk", "completed": false, "rank": "high", "created_at": 100, "updated_at": 200 }),
        );
        let renamed = list.rename(&TodoId::from(2), "Buy oat milk").await.unwrap().unwrap();

        assert_eq!(renamed.title, "Buy oat milk");
        let held = list.find(&TodoId::from(2)).unwrap();
        assert_eq!(held, &renamed);
        assert_eq!(held.extra["updated_at"], 200);
        assert_eq!(list.items()[1].id, TodoId::from(2), "position is kept");

        let sent = transport.requests();
        assert_eq!(sent[1].path, format!("{ITEMS_URL}/2"));
        let body: serde_json::Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "title": "Buy oat milk" }));
    }

    #[tokio::test]
    async fn toggle_unknown_id_is_local_not_found() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        let err = list.toggle_completed(&TodoId::from(99)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_local());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn toggle_sends_flipped_flag_and_trusts_response() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        // the server's answer wins even where it disagrees with the request
        transport.push_json(200, json!({ "id": 1, "title": "Walk the dog", "completed": true, "rank": "low" }));
        list.toggle_completed(&TodoId::from(1)).await.unwrap();

        let held = list.find(&TodoId::from(1)).unwrap();
        assert!(held.completed);
        assert_eq!(held.title, "Walk the dog");
        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "completed": true }));
    }

    #[tokio::test]
    async fn failed_update_leaves_item_untouched() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;
        let before = list.find(&TodoId::from(1)).cloned().unwrap();

        transport.push_failure(ApiError::Transport("connection reset".to_string()));
        let err = list.toggle_completed(&TodoId::from(1)).await.unwrap_err();

        assert!(err.to_string().ends_with(UPDATE_CONTEXT));
        assert_eq!(list.find(&TodoId::from(1)), Some(&before));
    }

    #[tokio::test]
    async fn change_rank_cycles() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;
        let id = TodoId::from(1);

        let mut sent_ranks = Vec::new();
        for next in ["mid", "high", "low", "mid"] {
            transport.push_json(200, json!({ "id": 1, "title": "Walk dog", "completed": false, "rank": next }));
            let todo = list.change_rank(&id).await.unwrap();
            assert_eq!(todo.rank.as_str(), next);

            let body: serde_json::Value =
                serde_json::from_str(transport.requests().last().unwrap().body.as_deref().unwrap()).unwrap();
            sent_ranks.push(body["rank"].as_str().unwrap().to_string());
        }
        assert_eq!(sent_ranks, ["mid", "high", "low", "mid"]);
        assert_eq!(list.find(&id).unwrap().rank, Rank::Mid);
    }

    #[tokio::test]
    async fn remove_drops_item_after_success() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        transport.push_response(204, "");
        list.remove(&TodoId::from(1)).await.unwrap();

        assert!(list.find(&TodoId::from(1)).is_none());
        assert_eq!(list.items().len(), 1);
        assert_eq!(transport.requests()[1].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn failed_remove_keeps_item() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        transport.push_response(500, "boom");
        let err = list.remove(&TodoId::from(1)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().ends_with(DELETE_CONTEXT));
        assert!(list.find(&TodoId::from(1)).is_some());
    }

    #[tokio::test]
    async fn unauthorized_does_not_end_session() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut list = loaded(&transport).await;

        transport.push_response(401, "");
        let err = list.reload().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(list.session.is_logged_in());
    }

    #[tokio::test]
    async fn get_fetches_without_touching_collection() {
        let transport = Arc::new(ScriptedTransport::new());
        let list = loaded(&transport).await;

        transport.push_json(200, json!({ "id": 1, "title": "Changed elsewhere", "completed": true, "rank": "low" }));
        let fetched = list.get(&TodoId::from(1)).await.unwrap();

        assert_eq!(fetched.title, "Changed elsewhere");
        assert_eq!(list.find(&TodoId::from(1)).unwrap().title, "Walk dog");
    }
}
