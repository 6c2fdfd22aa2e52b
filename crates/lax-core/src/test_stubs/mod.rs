//! 脚本化宿主桩。
//!
//! - [`ScriptedContext`]：可配置操作表、自动应答与在途队列的调用上下文；
//! - [`ScriptedRecordService`]：按脚本应答的记录服务；
//! - [`ScriptedComponentFactory`]：按描述符决定成败的组件工厂。
//!
//! 所有桩对象都是单线程的（`Rc` + `RefCell`），与宿主执行模型一致。
//! 回调在释放内部借用之后才被调用，处理器可以安全地重入桩对象。

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet, VecDeque},
    rc::Rc,
};

use crate::{
    action::{ActionOptions, Params},
    component::ComponentSpec,
    host::{
        ActionContext, ComponentFactory, ComponentHandle, CreationOutcome, OperationHandle,
        RecordService,
    },
    record::NewRecordRequest,
    response::{RawResponse, ResponseCallback, ResponseState},
};

/// 一次被提交的远程操作。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submission {
    pub name: String,
    pub params: Option<Params>,
    pub options: ActionOptions,
}

#[derive(Default)]
struct ContextState {
    invalid: Cell<bool>,
    refuse_marshal: Cell<bool>,
    marshalled: Cell<usize>,
    operations: RefCell<HashSet<String>>,
    scripted: RefCell<HashMap<String, RawResponse>>,
    inflight: RefCell<VecDeque<(String, ResponseCallback)>>,
    submissions: RefCell<Vec<Submission>>,
    record_services: RefCell<HashMap<String, Rc<dyn RecordService>>>,
    component_factory: RefCell<Option<Rc<dyn ComponentFactory>>>,
}

/// 可脚本化的调用上下文。
///
/// 克隆共享同一份内部状态：测试保留一个克隆用于驱动与断言，另一个交给 [`crate::attach`]。
#[derive(Clone, Default)]
pub struct ScriptedContext {
    state: Rc<ContextState>,
}

impl ScriptedContext {
    /// 空上下文：不暴露任何操作。
    pub fn new() -> Self {
        Self::default()
    }

    /// 暴露一个操作；提交后停留在在途队列中，等待 [`respond`](Self::respond)。
    pub fn with_operation(self, name: impl Into<String>) -> Self {
        self.state.operations.borrow_mut().insert(name.into());
        self
    }

    /// 暴露一个操作，并在每次提交时立即以 `response` 应答。
    pub fn with_response(self, name: impl Into<String>, response: RawResponse) -> Self {
        let name = name.into();
        self.state.operations.borrow_mut().insert(name.clone());
        self.state.scripted.borrow_mut().insert(name, response);
        self
    }

    /// 登记记录服务。
    pub fn with_record_service(self, id: impl Into<String>, service: Rc<dyn RecordService>) -> Self {
        self.state
            .record_services
            .borrow_mut()
            .insert(id.into(), service);
        self
    }

    /// 安装组件工厂。
    pub fn with_component_factory(self, factory: Rc<dyn ComponentFactory>) -> Self {
        *self.state.component_factory.borrow_mut() = Some(factory);
        self
    }

    /// 令 `marshal` 拒绝执行处理器，用于模拟不守约的宿主。
    pub fn refusing_marshal(self) -> Self {
        self.state.refuse_marshal.set(true);
        self
    }

    /// 在途（已提交、未应答）的操作数量。
    pub fn inflight(&self) -> usize {
        self.state.inflight.borrow().len()
    }

    /// 按提交顺序返回操作名称。
    pub fn submitted_names(&self) -> Vec<String> {
        self.state
            .submissions
            .borrow()
            .iter()
            .map(|submission| submission.name.clone())
            .collect()
    }

    /// 按提交顺序返回完整的提交记录。
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.submissions.borrow().clone()
    }

    /// 以 `response` 应答最早提交的同名在途操作；没有可应答的操作时返回 `false`。
    pub fn respond(&self, name: &str, response: RawResponse) -> bool {
        match self.take_inflight(name) {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }

    /// 丢弃最早提交的同名在途操作的回调而不调用。
    pub fn drop_inflight(&self, name: &str) -> bool {
        self.take_inflight(name).is_some()
    }

    /// 将上下文标记为已销毁。
    pub fn invalidate(&self) {
        self.state.invalid.set(true);
    }

    /// `marshal` 被调用的次数。
    pub fn marshal_count(&self) -> usize {
        self.state.marshalled.get()
    }

    fn take_inflight(&self, name: &str) -> Option<ResponseCallback> {
        let mut inflight = self.state.inflight.borrow_mut();
        let position = inflight.iter().position(|(pending, _)| pending == name)?;
        inflight.remove(position).map(|(_, callback)| callback)
    }
}

impl ActionContext for ScriptedContext {
    fn resolve_operation(&self, name: &str) -> Option<Box<dyn OperationHandle>> {
        if !self.state.operations.borrow().contains(name) {
            return None;
        }
        Some(Box::new(ScriptedOperation {
            state: self.state.clone(),
            submission: Submission {
                name: name.to_owned(),
                ..Submission::default()
            },
        }))
    }

    fn is_valid(&self) -> bool {
        !self.state.invalid.get()
    }

    fn marshal(&self, body: &mut dyn FnMut()) {
        self.state.marshalled.set(self.state.marshalled.get() + 1);
        if !self.state.refuse_marshal.get() {
            body();
        }
    }

    fn record_service(&self, id: &str) -> Option<Rc<dyn RecordService>> {
        self.state.record_services.borrow().get(id).cloned()
    }

    fn component_factory(&self) -> Option<Rc<dyn ComponentFactory>> {
        self.state.component_factory.borrow().clone()
    }
}

impl std::fmt::Debug for ScriptedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedContext")
            .field("valid", &!self.state.invalid.get())
            .field("inflight", &self.inflight())
            .finish_non_exhaustive()
    }
}

struct ScriptedOperation {
    state: Rc<ContextState>,
    submission: Submission,
}

impl OperationHandle for ScriptedOperation {
    fn set_params(&mut self, params: Params) {
        self.submission.params = Some(params);
    }

    fn set_storable(&mut self) {
        self.submission.options.storable = true;
    }

    fn set_background(&mut self) {
        self.submission.options.background = true;
    }

    fn submit(self: Box<Self>, callback: ResponseCallback) {
        let ScriptedOperation { state, submission } = *self;
        let name = submission.name.clone();
        state.submissions.borrow_mut().push(submission);

        let scripted = state.scripted.borrow().get(&name).cloned();
        match scripted {
            Some(response) => callback(response),
            None => state.inflight.borrow_mut().push_back((name, callback)),
        }
    }
}

/// 按脚本应答的记录服务。
///
/// - `save_record`/`delete_record` 依次消费预置响应；脚本耗尽后回调被丢弃；
/// - `get_new_record` 记录请求并立即回调，除非通过 [`without_template`](Self::without_template) 关闭。
#[derive(Default)]
pub struct ScriptedRecordService {
    save_responses: RefCell<VecDeque<RawResponse>>,
    delete_responses: RefCell<VecDeque<RawResponse>>,
    template_requests: RefCell<Vec<NewRecordRequest>>,
    withhold_template: Cell<bool>,
}

impl ScriptedRecordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次保存应答。
    pub fn with_save_response(self, response: RawResponse) -> Self {
        self.save_responses.borrow_mut().push_back(response);
        self
    }

    /// 追加一次删除应答。
    pub fn with_delete_response(self, response: RawResponse) -> Self {
        self.delete_responses.borrow_mut().push_back(response);
        self
    }

    /// 模板加载时丢弃回调而不调用。
    pub fn without_template(self) -> Self {
        self.withhold_template.set(true);
        self
    }

    /// 收到的模板请求。
    pub fn template_requests(&self) -> Vec<NewRecordRequest> {
        self.template_requests.borrow().clone()
    }
}

impl RecordService for ScriptedRecordService {
    fn get_new_record(&self, request: NewRecordRequest, callback: Box<dyn FnOnce()>) {
        self.template_requests.borrow_mut().push(request);
        if !self.withhold_template.get() {
            callback();
        }
    }

    fn save_record(&self, callback: ResponseCallback) {
        let next = self.save_responses.borrow_mut().pop_front();
        if let Some(response) = next {
            callback(response);
        }
    }

    fn delete_record(&self, callback: ResponseCallback) {
        let next = self.delete_responses.borrow_mut().pop_front();
        if let Some(response) = next {
            callback(response);
        }
    }
}

/// 按描述符决定成败的组件工厂。
///
/// 请求中任一描述符被标记为未知时，整体状态为 `ERROR`，并附带说明；
/// 也可以用 [`with_status`](Self::with_status) 强制整体状态。
#[derive(Default)]
pub struct ScriptedComponentFactory {
    unknown: RefCell<HashSet<String>>,
    forced: RefCell<Option<(ResponseState, String)>>,
    requests: RefCell<Vec<Vec<ComponentSpec>>>,
}

impl ScriptedComponentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 将描述符标记为未知。
    pub fn with_unknown(self, descriptor: impl Into<String>) -> Self {
        self.unknown.borrow_mut().insert(descriptor.into());
        self
    }

    /// 强制整体状态与说明。
    pub fn with_status(self, status: ResponseState, message: impl Into<String>) -> Self {
        *self.forced.borrow_mut() = Some((status, message.into()));
        self
    }

    /// 收到的批量请求。
    pub fn requests(&self) -> Vec<Vec<ComponentSpec>> {
        self.requests.borrow().clone()
    }

    fn outcome_for(&self, specs: &[ComponentSpec]) -> CreationOutcome {
        if let Some((status, error_message)) = self.forced.borrow().clone() {
            return CreationOutcome {
                components: Vec::new(),
                statuses: Vec::new(),
                status,
                error_message,
            };
        }

        let unknown = self.unknown.borrow();
        let statuses: Vec<ResponseState> = specs
            .iter()
            .map(|spec| {
                if unknown.contains(&spec.descriptor) {
                    ResponseState::Error
                } else {
                    ResponseState::Success
                }
            })
            .collect();
        let failed = specs
            .iter()
            .find(|spec| unknown.contains(&spec.descriptor));

        match failed {
            Some(spec) => CreationOutcome {
                components: Vec::new(),
                statuses,
                status: ResponseState::Error,
                error_message: format!("unknown component `{}`", spec.descriptor),
            },
            None => CreationOutcome {
                components: specs
                    .iter()
                    .map(|spec| ComponentHandle::new(spec.descriptor.clone(), spec.attributes.clone()))
                    .collect(),
                statuses,
                status: ResponseState::Success,
                error_message: String::new(),
            },
        }
    }
}

impl ComponentFactory for ScriptedComponentFactory {
    fn create_components(
        &self,
        specs: Vec<ComponentSpec>,
        callback: Box<dyn FnOnce(CreationOutcome)>,
    ) {
        let outcome = self.outcome_for(&specs);
        self.requests.borrow_mut().push(specs);
        callback(outcome);
    }
}
