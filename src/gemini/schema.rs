/// Prompts and response schemas for the two constrained model calls
use serde_json::{json, Value};

use crate::role::Status;

pub const MESSAGE_CLASSIFIER_PROMPT: &str = "Given these emails represented in JSON format, \
determine whether or not each message is a job application status update from a potential employer:";

pub const ROLE_EXTRACTOR_PROMPT: &str = "Given these emails represented in JSON format, \
extract application information into the provided schema. There is only one job per email:";

/// `{A, B, C}` listing of every status wire name
pub fn status_list() -> String {
    let names: Vec<&str> = Status::ALL.iter().map(Status::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

pub fn message_classifier_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {
                    "type": "STRING",
                    "description": "The message ID as provided in the input for this message"
                },
                "isJobApplicationRelated": {
                    "type": "BOOLEAN",
                    "description": "Whether or not the message is a job application status update from a potential employer"
                }
            },
            "required": ["id", "isJobApplicationRelated"]
        }
    })
}

pub fn role_extractor_schema() -> Value {
    let statuses: Vec<&str> = Status::ALL.iter().map(Status::as_str).collect();

    json!({
        "description": "Job information extracted from email data. There will only be one job per email",
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": {
                    "type": "STRING",
                    "description": "The message ID as provided in the input"
                },
                "title": {
                    "type": "STRING",
                    "description": "The job title as found in the subject and/or body, e.g. Software Engineer. \
If there is a requisition number or other identifying number after the title or elsewhere in the message, \
it must not be included here"
                },
                "requisitionNumber": {
                    "type": "STRING",
                    "description": "The role requisition number (or other identifying number) as found in the subject \
and/or body, e.g. 285343. Set to an empty string if there is none present"
                },
                "status": {
                    "type": "STRING",
                    "format": "enum",
                    "enum": statuses,
                    "description": format!(
                        "The current status of the application. Should be apparent from the subject and/or body. \
The possible statuses are {}. If none of the options seems to fit, choose the best fit, including for emails \
from the employer that are not application updates",
                        status_list()
                    )
                },
                "statusConfidence": {
                    "type": "NUMBER",
                    "description": "A value between 0 and 1 indicating the level of confidence in the choice of the \
'status' property. A value of zero means that the status could not be determined, either because the email is \
irrelevant, or is from the employer but not directly related to the application status"
                },
                "contacts": {
                    "type": "ARRAY",
                    "description": "An array of contacts. Include only if there are explicitly mentioned names in the \
message, such as recruiters or a hiring manager, along with a corresponding email address (which may or may not \
differ from the sender address)",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "email": {
                                "type": "STRING",
                                "description": "The email address of the contact, e.g. john.doe@company.com"
                            },
                            "name": {
                                "type": "STRING",
                                "description": "The name of the contact, e.g. John Doe"
                            },
                            "title": {
                                "type": "STRING",
                                "description": "The job title of the contact. Set to an empty string if there is none present"
                            }
                        },
                        "required": ["email", "name"]
                    }
                },
                "company": {
                    "type": "OBJECT",
                    "description": "Information about the company the candidate is applying to. Ensure that this is \
the actual target company of the job application, not other companies mentioned in the email, especially job \
boards or applicant tracking systems like LinkedIn, Indeed, Workday, Greenhouse, Lever, SuccessFactors, etc.",
                    "properties": {
                        "name": {
                            "type": "STRING",
                            "description": "The name of the company, e.g. Google. If you think it is LinkedIn, it \
probably isn't. Only assume it is LinkedIn if the contents of the email make it clear that the job itself is at LinkedIn"
                        },
                        "domain": {
                            "type": "STRING",
                            "description": "The domain of the company, e.g. google.com. If the domain is explicitly \
mentioned in the body or subject of the message (e.g. 'Visit our careers page at careers.dteenergy.com'), use that. \
Otherwise, if it is not in the sender email and cannot be reliably inferred from the company name, set it to an \
empty string. Never use the domain of a job board or applicant tracking system"
                        }
                    },
                    "required": ["name"]
                }
            },
            "required": ["id", "title", "status", "statusConfidence", "company"]
        }
    })
}
