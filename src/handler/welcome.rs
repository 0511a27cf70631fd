use crate::{
    core::{
        context::RequestContext,
        error::{DispatchError, DispatchResult},
    },
    handler::{Controller, ControllerDescriptor, HandlerOutput},
    http::request::Request,
};

pub const CONTROLLER_NAME: &str = "Welcome";

/// Landing page served when an application defines no routes of its own
pub struct Welcome {
    cli: bool,
}

impl Controller for Welcome {
    fn call(
        &mut self,
        method: &str,
        params: &[String],
        _ctx: &mut RequestContext,
    ) -> DispatchResult<HandlerOutput> {
        match method {
            "index" if self.cli => Ok(HandlerOutput::from(
                "Welcome to ignition. Rendered in {elapsed_time} seconds.\n",
            )),
            "index" => Ok(HandlerOutput::from(
                "<h1>Welcome to ignition</h1>\n<p>Page rendered in {elapsed_time} seconds.</p>\n",
            )),
            "echo" => Ok(format!("{}\n", params.join(" ")).into()),
            other => Err(DispatchError::Handler(format!(
                "{CONTROLLER_NAME} has no method {other}"
            ))),
        }
    }
}

pub fn descriptor() -> ControllerDescriptor {
    ControllerDescriptor::new(CONTROLLER_NAME, |request: &Request, _| {
        Ok(Box::new(Welcome {
            cli: request.is_cli(),
        }) as Box<dyn Controller>)
    })
    .methods(["index", "echo"])
}
