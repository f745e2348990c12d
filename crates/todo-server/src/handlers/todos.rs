//! Todo CRUD for the authenticated caller

use crate::deadline::run_with_deadline;
use crate::extractors::principal;
use crate::handlers::{timeout_for, to_status};
use crate::services::TodoManager;
use std::sync::Arc;
use std::time::Duration;
use todo_core::TodoFields;
use todo_proto::convert::split_update;
use todo_proto::proto::todo_service_server::TodoService as TodoRpc;
use todo_proto::proto::{
    CreateTodoRequest, DeleteTodoRequest, DeleteTodoResponse, GetTodoRequest, ListTodosRequest,
    ListTodosResponse, TodoReply, UpdateTodoRequest,
};
use tonic::{Request, Response, Status};

pub struct TodoHandler {
    todos: Arc<TodoManager>,
    request_timeout: Duration,
}

impl TodoHandler {
    pub fn new(todos: Arc<TodoManager>, request_timeout: Duration) -> Self {
        Self {
            todos,
            request_timeout,
        }
    }
}

#[tonic::async_trait]
impl TodoRpc for TodoHandler {
    async fn list_todos(
        &self,
        request: Request<ListTodosRequest>,
    ) -> Result<Response<ListTodosResponse>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let req = request.into_inner();

        run_with_deadline("ListTodos", timeout, async {
            let todos = self
                .todos
                .list_for(&principal, req.all)
                .await
                .map_err(to_status)?;
            Ok(Response::new(ListTodosResponse {
                todos: todos.into_iter().map(TodoReply::from).collect(),
            }))
        })
        .await
    }

    async fn get_todo(&self, request: Request<GetTodoRequest>) -> Result<Response<TodoReply>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let req = request.into_inner();

        run_with_deadline("GetTodo", timeout, async {
            let todo = self
                .todos
                .get(&principal, &req.id)
                .await
                .map_err(to_status)?;
            Ok(Response::new(todo.into()))
        })
        .await
    }

    async fn create_todo(
        &self,
        request: Request<CreateTodoRequest>,
    ) -> Result<Response<TodoReply>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let fields = TodoFields::from(request.into_inner());

        run_with_deadline("CreateTodo", timeout, async {
            let todo = self
                .todos
                .create(&principal, fields)
                .await
                .map_err(to_status)?;
            Ok(Response::new(todo.into()))
        })
        .await
    }

    async fn update_todo(
        &self,
        request: Request<UpdateTodoRequest>,
    ) -> Result<Response<TodoReply>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let (id, fields) = split_update(request.into_inner());

        run_with_deadline("UpdateTodo", timeout, async {
            let todo = self
                .todos
                .update(&principal, &id, fields)
                .await
                .map_err(to_status)?;
            Ok(Response::new(todo.into()))
        })
        .await
    }

    async fn delete_todo(
        &self,
        request: Request<DeleteTodoRequest>,
    ) -> Result<Response<DeleteTodoResponse>, Status> {
        let principal = principal(&request)?;
        let timeout = timeout_for(self.request_timeout, &request);
        let req = request.into_inner();

        run_with_deadline("DeleteTodo", timeout, async {
            self.todos
                .delete(&principal, &req.id)
                .await
                .map_err(to_status)?;
            Ok(Response::new(DeleteTodoResponse {}))
        })
        .await
    }
}
