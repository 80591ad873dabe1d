//! Server-rendered HTML.

// crates.io
use maud::{DOCTYPE, Markup, html};
// self
use crate::{
	auth::UserId,
	studio::ProjectList,
	workflow::{CreatedSession, FinishedSession},
};

/// Stylesheet served at `/style.css`.
pub const STYLE_CSS: &str = "\
body { font-family: sans-serif; margin: 2rem auto; max-width: 40rem; color: #222; }
h1 { font-size: 1.6rem; }
form { display: grid; gap: 0.75rem; margin-top: 1rem; }
label { display: grid; gap: 0.25rem; }
button, .button { background: #0067b1; border: 0; border-radius: 4px; color: #fff; cursor: pointer; padding: 0.5rem 1rem; text-decoration: none; width: fit-content; }
.error { background: #fdecea; border-left: 4px solid #c62828; padding: 0.75rem; }
dt { font-weight: bold; }
";

/// Login page linking to the provider redirect.
pub fn login() -> String {
	layout(
		"Sign in",
		html! {
			h1 { "Roundtripper" }
			p { "Sign in with your Bluebeam ID to start a review session." }
			a class="button" href="/oauth" { "Sign in" }
		},
	)
}

/// Project picker and upload form.
pub fn home(user: &UserId, projects: &ProjectList) -> String {
	layout(
		"Projects",
		html! {
			h1 { "Hello " (&**user) }
			form action="/create" method="post" enctype="multipart/form-data" {
				label {
					"Project"
					select name="project" required {
						@for project in &projects.projects {
							option value=(&*project.id) { (project.name) }
						}
					}
				}
				label { "Session name" input name="session" required; }
				label { "File" input type="file" name="sessionFile" accept=".pdf" required; }
				button type="submit" { "Create session" }
			}
		},
	)
}

/// Confirmation of a created session, carrying the identifiers `/finish` needs.
pub fn created(created: &CreatedSession) -> String {
	layout(
		"Session created",
		html! {
			h1 { "Session " (created.session_name) " is ready" }
			p {
				"Invite reviewers to session " code { (&*created.session) }
				". Finish it once the review is done."
			}
			form action="/finish" method="post" {
				input type="hidden" name="sessionId" value=(&*created.session);
				input type="hidden" name="projectId" value=(&*created.project);
				input type="hidden" name="fileSessionId" value=(created.session_file.0);
				input type="hidden" name="fileProjectId" value=(created.project_file.0);
				button type="submit" { "Finish session" }
			}
		},
	)
}

/// Result of a finished session.
pub fn finished(finished: &FinishedSession) -> String {
	layout(
		"Session finished",
		html! {
			h1 { "Session finished" }
			p { "The reviewed file was checked in and is being flattened." }
			dl {
				dt { "Flatten job" }
				dd { (finished.job.0) }
				dt { "Shared link" }
				dd { a href=(finished.link.share_link) { (finished.link.share_link) } }
			}
			a class="button" href="/" { "Start another session" }
		},
	)
}

/// Error page showing `description`.
pub fn error(description: &str) -> String {
	layout(
		"Error",
		html! {
			h1 { "Something went wrong" }
			p class="error" { (description) }
			a class="button" href="/" { "Back" }
		},
	)
}

fn layout(title: &str, body: Markup) -> String {
	let markup = html! {
		(DOCTYPE)
		html lang="en" {
			head {
				meta charset="utf-8";
				title { (title) " | Roundtripper" }
				link rel="stylesheet" href="/style.css";
			}
			body { (body) }
		}
	};

	markup.into_string()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::{JobId, ProjectFileId, ProjectId, SessionFileId, SessionId, SharedLinkId},
		studio::SharedLink,
	};

	#[test]
	fn error_page_escapes_markup() {
		let page = error("<a href=\"x\">Tom & Jerry</a>");

		assert!(page.starts_with("<!DOCTYPE html>"));
		assert!(page.contains("&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"));
		assert!(!page.contains("<a href=\"x\">"));
	}

	#[test]
	fn created_page_round_trips_the_finish_fields() {
		let page = created(&CreatedSession {
			session_name: "Plans <rev B>".into(),
			session: SessionId::new("123-456-789").expect("Session fixture should be valid."),
			project: ProjectId::new("222-333-444").expect("Project fixture should be valid."),
			session_file: SessionFileId(7),
			project_file: ProjectFileId(42),
		});

		assert!(page.contains("Plans &lt;rev B&gt;"));
		assert!(page.contains("name=\"sessionId\" value=\"123-456-789\""));
		assert!(page.contains("name=\"projectId\" value=\"222-333-444\""));
		assert!(page.contains("name=\"fileSessionId\" value=\"7\""));
		assert!(page.contains("name=\"fileProjectId\" value=\"42\""));
	}

	#[test]
	fn finished_page_links_the_share_url() {
		let page = finished(&FinishedSession {
			job: JobId(9),
			link: SharedLink {
				id: SharedLinkId(1),
				share_link: "https://studio.example.com/s/abc".into(),
			},
		});

		assert!(page.contains("href=\"https://studio.example.com/s/abc\""));
		assert!(page.contains("<dd>9</dd>"));
	}
}
