use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use common::error::AppError;
use retrieval_pipeline::{HybridRetrievalEngine, RetrievedMovie};

use crate::{
    events::{AnswerSource, ChatEvent},
    fallback::FallbackInvoker,
    providers::{ExternalResult, ExternalSearch},
    session::{SessionMessage, SessionStore},
};

/// Terminal reply when every stage comes up empty.
pub const APOLOGY: &str = "Xin lỗi, tôi không tìm thấy thông tin liên quan từ cơ sở dữ liệu và Internet. Vui lòng thử với câu hỏi khác.";

/// Vietnamese markers that reveal a grounded model reply as a miss. Checked
/// case-insensitively against the whole answer.
const NOT_FOUND_MARKERS: &[&str] = &[
    "không tìm thấy",
    "không có thông tin",
    "không rõ",
    "không phát hiện",
    "lỗi máy chủ",
    "tất cả các model",
    "xin lỗi",
    "không có kết quả",
];

const SYNTHESIS_SYSTEM_PROMPT: &str = "Bạn là trợ lý phim ảnh thông minh. Tổng hợp thông tin được cung cấp thành câu trả lời tự nhiên, chính xác và dễ hiểu. Trả lời bằng tiếng Việt.";

/// Whether a database-grounded answer admits it found nothing, which is the
/// trigger to escalate to the external stages.
pub fn is_miss(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Drives a question through the escalation ladder: local database first,
/// then TMDB metadata, then web search, emitting progress events along the
/// way and exactly one terminal event at the end.
pub struct EscalationController {
    retrieval: Arc<HybridRetrievalEngine>,
    sessions: Arc<SessionStore>,
    invoker: Arc<FallbackInvoker>,
    tmdb: Arc<dyn ExternalSearch>,
    web: Arc<dyn ExternalSearch>,
    hide_overview: bool,
}

impl EscalationController {
    pub fn new(
        retrieval: Arc<HybridRetrievalEngine>,
        sessions: Arc<SessionStore>,
        invoker: Arc<FallbackInvoker>,
        tmdb: Arc<dyn ExternalSearch>,
        web: Arc<dyn ExternalSearch>,
        hide_overview: bool,
    ) -> Self {
        Self {
            retrieval,
            sessions,
            invoker,
            tmdb,
            web,
            hide_overview,
        }
    }

    /// Runs the ladder on a background task and returns the event stream.
    /// Internal faults surface as a terminal error event rather than a
    /// broken stream.
    pub fn answer_stream(
        self: &Arc<Self>,
        question: String,
        session_id: String,
    ) -> impl Stream<Item = ChatEvent> {
        let (tx, mut rx) = mpsc::channel(16);
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(fault) = controller.run(&question, &session_id, &tx).await {
                error!("Chat escalation failed: {fault}");
                let _ = tx.send(ChatEvent::server_error()).await;
            }
        });

        async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
    }

    async fn run(
        &self,
        question: &str,
        session_id: &str,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> Result<(), AppError> {
        let _ = tx.send(ChatEvent::db_search()).await;

        let mut answer = self.answer_from_database(question, session_id).await?;
        let mut searched_tmdb = false;
        let mut searched_google = false;
        let mut source = AnswerSource::Database;

        if is_miss(&answer) {
            info!("Database answer is a miss, escalating");
            let _ = tx.send(ChatEvent::db_not_found()).await;

            searched_tmdb = true;
            if let Some(results) = self.tmdb.search(question).await {
                source = AnswerSource::Tmdb;
                let _ = tx.send(ChatEvent::tmdb_found()).await;
                answer = self.synthesize(question, &results, "Phim").await;
            } else {
                searched_google = true;
                if let Some(results) = self.web.search(question).await {
                    source = AnswerSource::Google;
                    let _ = tx.send(ChatEvent::google_found()).await;
                    answer = self.synthesize(question, &results, "Kết quả").await;
                } else {
                    info!("Every stage missed, answering with the apology");
                    source = AnswerSource::None;
                    answer = APOLOGY.to_owned();
                }
            }
        }

        let _ = tx
            .send(ChatEvent::final_answer(
                answer,
                searched_tmdb,
                searched_google,
                source,
            ))
            .await;
        Ok(())
    }

    /// Retrieves local evidence, folds it into the session history and asks
    /// the model chain. The session lock is held across the completion so
    /// concurrent requests for one session cannot interleave their turns.
    async fn answer_from_database(
        &self,
        question: &str,
        session_id: &str,
    ) -> Result<String, AppError> {
        let movies = self.retrieval.retrieve(question).await?;
        debug!(movie_count = movies.len(), "Evidence retrieved for question");

        let context = self.movie_context(&movies);
        let prompt = if context.is_empty() {
            format!("Câu hỏi: {question}")
        } else {
            format!("Dữ liệu phim:\n{context}\n\nCâu hỏi: {question}")
        };

        let session = self.sessions.checkout(session_id);
        let mut state = session.lock().await;
        state.push_user(prompt);
        let answer = self.invoker.complete(state.messages()).await?;
        state.push_assistant(answer.clone());
        Ok(answer)
    }

    fn movie_context(&self, movies: &[RetrievedMovie]) -> String {
        movies
            .iter()
            .enumerate()
            .map(|(index, movie)| {
                let metadata = &movie.metadata;
                let director = metadata.director().unwrap_or("Không rõ");
                let cast = metadata.top_cast(3);
                let year = metadata.release_date.as_deref().unwrap_or("Không rõ");
                let rating = metadata
                    .vote_average
                    .map_or_else(|| "N/A".to_owned(), |average| average.to_string());
                let base = format!(
                    "Phim {}: {} | Năm: {} | Điểm: {} | Đạo diễn: {} | Diễn viên: {}",
                    index + 1,
                    metadata.title,
                    year,
                    rating,
                    director,
                    cast,
                );
                if self.hide_overview {
                    base
                } else {
                    format!("{base} | Nội dung: {}", metadata.overview)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Turns external results into a natural-language answer with a single
    /// primary-model call, outside the session history. If the model is
    /// unavailable the raw results are formatted as a markdown listing so
    /// the stage still answers.
    async fn synthesize(
        &self,
        question: &str,
        results: &[ExternalResult],
        item_label: &str,
    ) -> String {
        let context = results
            .iter()
            .enumerate()
            .map(|(index, result)| {
                format!("{item_label} {}: {}\n{}", index + 1, result.title, result.snippet)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Dựa trên thông tin sau đây, hãy trả lời câu hỏi của người dùng một cách tự nhiên, chi tiết và có cấu trúc rõ ràng bằng tiếng Việt:\n\n{context}\n\nCâu hỏi: {question}\n\nHãy tổng hợp thông tin trên thành câu trả lời mạch lạc, dễ hiểu. Nếu có nhiều phim/kết quả, liệt kê ngắn gọn từng item với thông tin quan trọng nhất. Hãy chắc chắn rằng câu trả lời của bạn hoàn toàn dựa trên dữ liệu được cung cấp."
        );
        let messages = vec![
            SessionMessage::system(SYNTHESIS_SYSTEM_PROMPT),
            SessionMessage::user(prompt),
        ];

        match self.invoker.complete_with_primary(&messages).await {
            Ok(answer) => answer,
            Err(fault) => {
                error!("Answer synthesis failed, falling back to a listing: {fault}");
                format_listing(results)
            }
        }
    }
}

/// Markdown listing of external results, used when synthesis is
/// unavailable.
fn format_listing(results: &[ExternalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            format!(
                "{}. **{}**\n{}\n🔗 [Xem chi tiết]({})",
                index + 1,
                result.title,
                result.snippet,
                result.link,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
