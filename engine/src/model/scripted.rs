//! A model that replays canned answers and remembers what it was asked.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{
    ModelBox,
    model::{GenerationFailure, GenerationFuture, GenerativeModel, Request, Response},
};

type Script = Arc<Mutex<VecDeque<Result<Response, GenerationFailure>>>>;
pub(crate) type RequestLog = Arc<Mutex<Vec<Request>>>;

pub(crate) struct ScriptedModel {
    script: Script,
    log: RequestLog,
}

impl ScriptedModel {
    pub fn new(answers: impl IntoIterator<Item = Result<Response, GenerationFailure>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(answers.into_iter().collect())),
            log: RequestLog::default(),
        }
    }

    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }
}

impl GenerativeModel for ScriptedModel {
    fn generate(&self, req: Request) -> GenerationFuture<'_> {
        self.log.lock().unwrap().push(req);
        let answer = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationFailure::EmptyResponse));
        Box::pin(async move { answer })
    }

    fn clone(&self) -> ModelBox {
        Box::new(ScriptedModel {
            script: self.script.clone(),
            log: self.log.clone(),
        })
    }
}
